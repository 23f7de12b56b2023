//! Request handlers
//!
//! The configuration flow is `/configure/` -> Google -> `/return/` ->
//! `/mailboxes/` -> back to the publisher with the new user id. The
//! publisher then fetches `/edition/?id=..` once a day.

use log::{error, info, warn};
use mail::edition::MAX_SAMPLE_DAYS;
use mail::{
    AuthError, MailSession, UserId, build_edition, edition_etag, purge_user, sample_edition,
};

use crate::app::App;
use crate::form::{FormErrors, default_rows, parse_rows, validate};
use crate::http::{HttpRequest, Method, Reply};
use crate::session::{SESSION_COOKIE, Session, session_cookie};
use crate::templates;

const RETURN_PATH: &str = "/return/";
const MAILBOXES_PATH: &str = "/mailboxes/";
const AUTH_REVOKED_PATH: &str = "/auth-revoked/";

/// Dispatch a request, attaching a session cookie when one was issued
pub fn handle(app: &App, req: &HttpRequest) -> Reply {
    let (sid, fresh) = app.sessions.resolve(req.cookie(SESSION_COOKIE));

    let reply = route(app, req, &sid);

    if fresh {
        reply.with_header("Set-Cookie", session_cookie(&sid))
    } else {
        reply
    }
}

fn route(app: &App, req: &HttpRequest, sid: &str) -> Reply {
    let path = req.path.as_str();
    match (req.method, path) {
        (Method::Get, "/favicon.ico") => Reply::empty(410),
        (Method::Get, "/configure/") => configure(app, req, sid),
        (Method::Get, RETURN_PATH) => return_from_google(app, req, sid),
        (Method::Get, MAILBOXES_PATH) => mailboxes_form(app, sid),
        (Method::Post, MAILBOXES_PATH) => mailboxes_submit(app, req, sid),
        (Method::Get, "/edition/") => edition(app, req),
        (Method::Get, AUTH_REVOKED_PATH) => auth_revoked(app, req),
        (Method::Get, p) if p.starts_with("/sample/") => sample(app, req, p),
        (_, "/configure/" | RETURN_PATH | MAILBOXES_PATH | "/edition/" | AUTH_REVOKED_PATH) => {
            error_reply(405, "Method not allowed")
        }
        _ => error_reply(404, "Not found"),
    }
}

fn error_reply(status: u16, message: &str) -> Reply {
    if status >= 500 {
        error!("[HTTP] {}: {}", status, message);
    } else {
        warn!("[HTTP] {}: {}", status, message);
    }
    Reply::html(status, templates::error_page(message))
}

/// A cached copy is current if the publisher already has today's tag
fn not_modified(req: &HttpRequest, etag: &str) -> bool {
    req.header("If-None-Match")
        .is_some_and(|tag| tag.trim().trim_matches('"') == etag)
}

fn configure(app: &App, req: &HttpRequest, sid: &str) -> Reply {
    let Some(return_url) = req.query_param("return_url") else {
        return error_reply(400, "No return_url parameter was provided");
    };

    let error_url = req.query_param("error_url").map(String::from);
    app.sessions.update(sid, |s| {
        s.return_url = Some(return_url.to_string());
        s.error_url = error_url;
    });

    Reply::redirect(app.provider.authorize_url(&app.settings.url(RETURN_PATH)))
}

fn return_from_google(app: &App, req: &HttpRequest, sid: &str) -> Reply {
    let Some(code) = req.query_param("code") else {
        return match app.sessions.get(sid).error_url {
            Some(url) => Reply::redirect(url),
            None => error_reply(500, "No access token was returned by Google"),
        };
    };

    match app.provider.exchange_code(code, &app.settings.url(RETURN_PATH)) {
        Ok(grant) => {
            app.sessions
                .update(sid, |s| s.refresh_token = Some(grant.refresh_token));
            Reply::redirect(app.settings.url(MAILBOXES_PATH))
        }
        Err(AuthError::Provider {
            status, description, ..
        }) => {
            let status = if (400..=599).contains(&status) { status } else { 500 };
            error_reply(
                status,
                &format!("Error when trying to get an access token from Google: {}", description),
            )
        }
        Err(e) => error_reply(
            500,
            &format!("Error when trying to get an access token from Google: {}", e),
        ),
    }
}

/// Log in with a refresh token, turning failures into replies
fn open_mail(app: &App, refresh_token: &str) -> Result<MailSession, Reply> {
    match app.provider.open(refresh_token) {
        Ok(session) => Ok(session),
        Err(AuthError::Revoked) => Err(Reply::redirect(app.settings.url(AUTH_REVOKED_PATH))),
        Err(e) => Err(error_reply(500, &format!("Error when trying to log in: {}", e))),
    }
}

/// Selectable and unselectable mailboxes, plus the account address
fn list_mailboxes(app: &App, session: &Session) -> Result<(String, Vec<mail::MailboxInfo>), Reply> {
    let Some(token) = &session.refresh_token else {
        return Err(error_reply(
            400,
            "Your session has expired; please start again from your subscription page",
        ));
    };

    let mut mail = open_mail(app, token)?;
    let email = mail.email.clone();
    let listed = mail.source.list_mailboxes();
    mail.close();

    match listed {
        Ok(mailboxes) => Ok((email, mailboxes)),
        Err(e) => Err(error_reply(500, &format!("Error fetching mailboxes: {:#}", e))),
    }
}

fn mailboxes_form(app: &App, sid: &str) -> Reply {
    let session = app.sessions.get(sid);

    let (email, mailboxes) = match list_mailboxes(app, &session) {
        Ok(listed) => listed,
        Err(reply) => return reply,
    };

    // A rejected submission is shown once, then forgotten
    let (rows, errors) = match session.rejected_form {
        Some(rejected) => {
            app.sessions.update(sid, |s| s.rejected_form = None);
            rejected
        }
        None => (default_rows(), FormErrors::default()),
    };

    Reply::html(200, templates::mailboxes_page(&email, &mailboxes, &rows, &errors))
}

fn mailboxes_submit(app: &App, req: &HttpRequest, sid: &str) -> Reply {
    let session = app.sessions.get(sid);

    let (_, mailboxes) = match list_mailboxes(app, &session) {
        Ok(listed) => listed,
        Err(reply) => return reply,
    };
    let selectable: Vec<String> = mailboxes
        .into_iter()
        .filter(|mb| mb.selectable)
        .map(|mb| mb.name)
        .collect();

    let rows = parse_rows(|name| req.form_param(name).map(String::from));

    let selection = match validate(&rows, &selectable) {
        Ok(selection) => selection,
        Err(errors) => {
            app.sessions
                .update(sid, |s| s.rejected_form = Some((rows, errors)));
            return Reply::redirect(app.settings.url(MAILBOXES_PATH));
        }
    };

    let (Some(refresh_token), Some(return_url)) = (session.refresh_token, session.return_url) else {
        return error_reply(
            400,
            "Your session has expired; please start again from your subscription page",
        );
    };

    match app.users.create(&refresh_token, selection) {
        Ok(id) => {
            app.sessions.update(sid, |s| {
                s.refresh_token = None;
                s.rejected_form = None;
            });
            info!("[HTTP] Configured user {}", id);
            let sep = if return_url.contains('?') { '&' } else { '?' };
            Reply::redirect(format!("{}{}config[id]={}", return_url, sep, id))
        }
        Err(e) => error_reply(500, &format!("Error saving your choices: {:#}", e)),
    }
}

fn edition(app: &App, req: &HttpRequest) -> Reply {
    let id = req.query_param("id").unwrap_or_default();
    let user_id = UserId::new(id);
    info!("[HTTP] Starting edition for {}", user_id);

    let user = match app.users.get(&user_id) {
        Ok(Some(user)) => user,
        Ok(None) => return error_reply(500, &format!("No user data found for ID '{}'", id)),
        Err(e) => return error_reply(500, &format!("Error loading user '{}': {:#}", id, e)),
    };

    let today = app.history.today();
    let etag = edition_etag(user_id.as_str(), today);
    if not_modified(req, &etag) {
        return Reply::empty(304).with_etag(&etag);
    }

    let mut mail = match app.provider.open(&user.refresh_token) {
        Ok(mail) => mail,
        Err(AuthError::Revoked) => {
            warn!("[HTTP] Access revoked for {}; forgetting them", user_id);
            if let Err(e) = purge_user(&app.users, &app.history, &user_id, &user) {
                error!("[HTTP] Failed to purge {}: {:#}", user_id, e);
            }
            return Reply::redirect(app.settings.url(AUTH_REVOKED_PATH));
        }
        Err(e) => return error_reply(500, &format!("Error when trying to log in: {}", e)),
    };

    let built = build_edition(&mut mail, &app.history, &user_id, &user);
    mail.close();

    match built {
        Ok(edition) => {
            Reply::html(200, templates::publication(&edition, today)).with_etag(&etag)
        }
        Err(e) => error_reply(500, &format!("Error building edition: {:#}", e)),
    }
}

/// `/sample/` or `/sample/N/` for N days of history
fn sample(app: &App, req: &HttpRequest, path: &str) -> Reply {
    let rest = path.trim_start_matches("/sample/");
    let days = if rest.is_empty() {
        MAX_SAMPLE_DAYS
    } else {
        match rest.strip_suffix('/').and_then(|n| n.parse::<usize>().ok()) {
            Some(days) => days,
            None => return error_reply(404, "Not found"),
        }
    };

    let today = app.history.today();
    let etag = edition_etag("sample", today);
    if not_modified(req, &etag) {
        return Reply::empty(304).with_etag(&etag);
    }

    let edition = sample_edition(today, days);
    Reply::html(200, templates::publication(&edition, today)).with_etag(&etag)
}

fn auth_revoked(app: &App, req: &HttpRequest) -> Reply {
    let etag = edition_etag("auth-revoked", app.history.today());
    if not_modified(req, &etag) {
        return Reply::empty(304).with_etag(&etag);
    }
    Reply::html(200, templates::auth_revoked()).with_etag(&etag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use chrono::NaiveDate;
    use mail::{
        FixedClock, Grant, InMemoryKvStore, KvStore, MailProvider, MailSource, MailboxInfo,
        MailboxSelection, Metric,
    };

    use crate::settings::Settings;

    struct FakeSource;

    impl MailSource for FakeSource {
        fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
            Ok(vec![
                MailboxInfo::new("INBOX", true),
                MailboxInfo::new("[Gmail]", false),
                MailboxInfo::new("[Gmail]/Starred", true),
            ])
        }

        fn count(&mut self, mailbox: &str, metric: Metric) -> Result<u64> {
            match (mailbox, metric) {
                ("INBOX", _) => Ok(1234),
                ("[Gmail]/Starred", _) => Ok(5),
                _ => anyhow::bail!("Mailbox {} doesn't exist", mailbox),
            }
        }

        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        revoked: Mutex<bool>,
    }

    impl MailProvider for FakeProvider {
        fn authorize_url(&self, redirect_uri: &str) -> String {
            format!("https://accounts.test/auth?redirect_uri={}", redirect_uri)
        }

        fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<Grant, AuthError> {
            if code == "bad" {
                return Err(AuthError::Provider {
                    status: 400,
                    code: "invalid_request".to_string(),
                    description: "Malformed auth code".to_string(),
                });
            }
            Ok(Grant {
                access_token: "access".to_string(),
                refresh_token: format!("refresh-{}", code),
            })
        }

        fn open(&self, _refresh_token: &str) -> Result<MailSession, AuthError> {
            if *self.revoked.lock().unwrap() {
                return Err(AuthError::Revoked);
            }
            Ok(MailSession {
                email: "reader@gmail.com".to_string(),
                source: Box::new(FakeSource),
            })
        }
    }

    struct Fixture {
        app: App,
        kv: Arc<InMemoryKvStore>,
        provider: Arc<FakeProvider>,
        cookie: Option<String>,
    }

    /// Forwards to a shared fake so tests can flip its behaviour
    struct SharedProvider(Arc<FakeProvider>);

    impl MailProvider for SharedProvider {
        fn authorize_url(&self, redirect_uri: &str) -> String {
            self.0.authorize_url(redirect_uri)
        }

        fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Grant, AuthError> {
            self.0.exchange_code(code, redirect_uri)
        }

        fn open(&self, refresh_token: &str) -> Result<MailSession, AuthError> {
            self.0.open(refresh_token)
        }
    }

    impl Fixture {
        fn new() -> Self {
            let kv = Arc::new(InMemoryKvStore::new());
            let provider = Arc::new(FakeProvider::default());
            let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
            let settings = Settings {
                public_url: "https://almanac.test".to_string(),
                ..Settings::default()
            };
            let app = App::new(
                settings,
                Box::new(SharedProvider(provider.clone())),
                kv.clone(),
                clock,
            );
            Self {
                app,
                kv,
                provider,
                cookie: None,
            }
        }

        /// Send a request, carrying the session cookie like a browser
        fn send(&mut self, req: HttpRequest) -> Reply {
            let req = match &self.cookie {
                Some(c) => req.with_cookie_header(c),
                None => req,
            };
            let reply = handle(&self.app, &req);
            if let Some(set) = reply.header("Set-Cookie") {
                self.cookie = set.split(';').next().map(String::from);
            }
            reply
        }

        fn get(&mut self, target: &str) -> Reply {
            self.send(HttpRequest::new(Method::Get, target))
        }

        fn post(&mut self, target: &str, body: &str) -> Reply {
            self.send(HttpRequest::new(Method::Post, target).with_form_body(body))
        }

        /// Run the flow up to the mailbox form
        fn authorize(&mut self) {
            self.get("/configure/?return_url=https%3A%2F%2Fpublisher.test%2Fdone&error_url=https%3A%2F%2Fpublisher.test%2Ferr");
            let reply = self.get("/return/?code=abc");
            assert_eq!(reply.status, 302);
        }

        fn create_user(&self) -> UserId {
            self.app
                .users
                .create(
                    "refresh",
                    vec![
                        MailboxSelection::new("INBOX", Metric::Total),
                        MailboxSelection::new("[Gmail]/Starred", Metric::Flagged),
                    ],
                )
                .unwrap()
        }
    }

    #[test]
    fn test_favicon_gone() {
        assert_eq!(Fixture::new().get("/favicon.ico").status, 410);
    }

    #[test]
    fn test_configure_requires_return_url() {
        let reply = Fixture::new().get("/configure/");
        assert_eq!(reply.status, 400);
        assert!(reply.body.contains("No return_url parameter was provided"));
    }

    #[test]
    fn test_configure_redirects_to_provider() {
        let mut fx = Fixture::new();
        let reply = fx.get("/configure/?return_url=https%3A%2F%2Fpublisher.test%2Fdone");
        assert_eq!(reply.status, 302);
        assert_eq!(
            reply.header("Location"),
            Some("https://accounts.test/auth?redirect_uri=https://almanac.test/return/")
        );
        assert!(reply.header("Set-Cookie").unwrap().starts_with("almanac_session="));
    }

    #[test]
    fn test_return_without_code_goes_to_error_url() {
        let mut fx = Fixture::new();
        fx.get("/configure/?return_url=r&error_url=https%3A%2F%2Fpublisher.test%2Ferr");
        let reply = fx.get("/return/");
        assert_eq!(reply.header("Location"), Some("https://publisher.test/err"));

        let reply = Fixture::new().get("/return/");
        assert_eq!(reply.status, 500);
    }

    #[test]
    fn test_return_with_rejected_code() {
        let mut fx = Fixture::new();
        fx.get("/configure/?return_url=r");
        let reply = fx.get("/return/?code=bad");
        assert_eq!(reply.status, 400);
        assert!(reply.body.contains("Malformed auth code"));
    }

    #[test]
    fn test_mailbox_form_lists_selectable_mailboxes() {
        let mut fx = Fixture::new();
        fx.authorize();

        let reply = fx.get("/mailboxes/");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("reader@gmail.com"));
        assert!(reply.body.contains(r#"<option value="INBOX" selected>"#));
        assert!(reply.body.contains(r#"value="[Gmail]/Starred""#));
        assert!(!reply.body.contains(r#"value="[Gmail]""#));
    }

    #[test]
    fn test_mailbox_form_without_authorization() {
        assert_eq!(Fixture::new().get("/mailboxes/").status, 400);
    }

    #[test]
    fn test_invalid_submission_shows_errors_once() {
        let mut fx = Fixture::new();
        fx.authorize();

        let reply = fx.post("/mailboxes/", "mailbox-1=Nope&metric-1=unread");
        assert_eq!(reply.header("Location"), Some("https://almanac.test/mailboxes/"));

        let form = fx.get("/mailboxes/");
        assert!(form.body.contains("This isn&#39;t a valid mailbox name"));
        assert!(form.body.contains("Please select at least one mailbox"));

        let form = fx.get("/mailboxes/");
        assert!(!form.body.contains("valid mailbox name"));
    }

    #[test]
    fn test_valid_submission_creates_user() {
        let mut fx = Fixture::new();
        fx.authorize();

        let reply = fx.post(
            "/mailboxes/",
            "mailbox-1=INBOX&metric-1=unread&mailbox-2=%5BGmail%5D%2FStarred&metric-2=bogus",
        );
        assert_eq!(reply.status, 302);
        let location = reply.header("Location").unwrap();
        let id = location
            .strip_prefix("https://publisher.test/done?config[id]=")
            .unwrap();

        let user = fx.app.users.get(&UserId::new(id)).unwrap().unwrap();
        assert_eq!(user.refresh_token, "refresh-abc");
        assert_eq!(
            user.mailboxes,
            vec![
                MailboxSelection::new("INBOX", Metric::Unread),
                MailboxSelection::new("[Gmail]/Starred", Metric::Total),
            ]
        );
    }

    #[test]
    fn test_edition_renders_with_etag() {
        let mut fx = Fixture::new();
        let id = fx.create_user();

        let reply = fx.get(&format!("/edition/?id={}", id));
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("1,234 messages total"));
        assert!(reply.body.contains("5 messages starred"));

        let etag = reply.header("ETag").unwrap().to_string();
        let cached = fx.send(
            HttpRequest::new(Method::Get, &format!("/edition/?id={}", id))
                .with_header("If-None-Match", &etag),
        );
        assert_eq!(cached.status, 304);
    }

    #[test]
    fn test_edition_for_unknown_user() {
        let reply = Fixture::new().get("/edition/?id=nobody");
        assert_eq!(reply.status, 500);
        assert!(reply.body.contains("No user data found for ID &#39;nobody&#39;"));
    }

    #[test]
    fn test_revoked_edition_purges_user() {
        let mut fx = Fixture::new();
        let id = fx.create_user();
        fx.get(&format!("/edition/?id={}", id));
        *fx.provider.revoked.lock().unwrap() = true;

        let reply = fx.get(&format!("/edition/?id={}", id));
        assert_eq!(reply.header("Location"), Some("https://almanac.test/auth-revoked/"));
        assert!(fx.app.users.get(&id).unwrap().is_none());
        assert!(fx.kv.hgetall("almanac:user").unwrap().is_empty());

        let history = fx.app.history.get_history(&id, "INBOX", Metric::Total).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_sample() {
        let mut fx = Fixture::new();
        let reply = fx.get("/sample/");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("Showing 30 days"));

        let reply = fx.get("/sample/5/");
        assert!(reply.body.contains("Showing 5 days"));

        assert_eq!(fx.get("/sample/abc/").status, 404);
    }

    #[test]
    fn test_auth_revoked_page() {
        let reply = Fixture::new().get("/auth-revoked/");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("unsubscribe"));
        assert!(reply.header("ETag").is_some());
    }
}
