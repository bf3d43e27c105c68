use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

/// The authenticated principal. Immutable once created; changing role means
/// logout and a fresh login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub credential_token: String,
}

/// One persisted slot per workspace. Absence of the file means no session,
/// and so does any payload that fails to parse (including an unknown role).
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(workspace: &Path) -> SessionStore {
        SessionStore {
            path: workspace.join(SESSION_FILE),
        }
    }

    pub fn restore(&self) -> Option<Identity> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(v) => v,
            Err(_) => return None,
        };
        match serde_json::from_str::<Identity>(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "discarding malformed session slot");
                None
            }
        }
    }

    pub fn save(&self, identity: &Identity) -> anyhow::Result<()> {
        let payload = serde_json::to_string_pretty(identity)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-wide session: at most one live Identity, backed by the store.
/// Created when a workspace is selected, torn down with it.
pub struct Session {
    store: SessionStore,
    current: Option<Identity>,
}

impl Session {
    pub fn init(workspace: &Path) -> Session {
        let store = SessionStore::new(workspace);
        let current = store.restore();
        Session { store, current }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    /// Demo semantics carried over from the source app: credentials are not
    /// verified, the identity is synthesized from the claimed role, with the
    /// submitted identifier (student number or admin email) kept as the id.
    /// A second login simply replaces the first (last write wins).
    pub fn login(&mut self, role: Role, claimed_id: Option<&str>) -> anyhow::Result<Identity> {
        let identity = match role {
            Role::Student => Identity {
                id: claimed_id.unwrap_or("S001").to_string(),
                display_name: "John Doe".to_string(),
                role: Role::Student,
                credential_token: "demo-token-student".to_string(),
            },
            Role::Admin => Identity {
                id: claimed_id.unwrap_or("admin@example.com").to_string(),
                display_name: "Admin User".to_string(),
                role: Role::Admin,
                credential_token: "demo-token-admin".to_string(),
            },
        };
        self.store.save(&identity)?;
        self.current = Some(identity.clone());
        Ok(identity)
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.store.clear()?;
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn demo_identity() -> Identity {
        Identity {
            id: "1".to_string(),
            display_name: "John Doe".to_string(),
            role: Role::Student,
            credential_token: "demo-token-student".to_string(),
        }
    }

    #[test]
    fn save_then_restore_round_trips() {
        let ws = temp_workspace("recordsd-session-roundtrip");
        let store = SessionStore::new(&ws);
        let identity = demo_identity();
        store.save(&identity).expect("save");
        assert_eq!(store.restore(), Some(identity));
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn restore_on_empty_store_is_none() {
        let ws = temp_workspace("recordsd-session-empty");
        let store = SessionStore::new(&ws);
        assert_eq!(store.restore(), None);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn malformed_payload_reads_as_no_session() {
        let ws = temp_workspace("recordsd-session-malformed");
        std::fs::write(ws.join(SESSION_FILE), "{not json").expect("write");
        let store = SessionStore::new(&ws);
        assert_eq!(store.restore(), None);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn unknown_role_reads_as_no_session() {
        let ws = temp_workspace("recordsd-session-badrole");
        std::fs::write(
            ws.join(SESSION_FILE),
            r#"{"id":"1","displayName":"X","role":"superuser","credentialToken":"t"}"#,
        )
        .expect("write");
        let store = SessionStore::new(&ws);
        assert_eq!(store.restore(), None);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn clear_is_idempotent() {
        let ws = temp_workspace("recordsd-session-clear");
        let store = SessionStore::new(&ws);
        store.save(&demo_identity()).expect("save");
        store.clear().expect("first clear");
        store.clear().expect("second clear");
        assert_eq!(store.restore(), None);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn login_keeps_the_claimed_identifier() {
        let ws = temp_workspace("recordsd-session-claimed");
        let mut session = Session::init(&ws);
        let identity = session
            .login(Role::Student, Some("S042"))
            .expect("login with claimed id");
        assert_eq!(identity.id, "S042");

        let fallback = session.login(Role::Student, None).expect("login default");
        assert_eq!(fallback.id, "S001");
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn second_login_overwrites_first() {
        let ws = temp_workspace("recordsd-session-lastwins");
        let mut session = Session::init(&ws);
        session.login(Role::Student, None).expect("student login");
        session.login(Role::Admin, None).expect("admin login");
        assert_eq!(session.identity().map(|i| i.role), Some(Role::Admin));
        assert_eq!(
            SessionStore::new(&ws).restore().map(|i| i.role),
            Some(Role::Admin)
        );
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn logout_after_login_restores_none() {
        let ws = temp_workspace("recordsd-session-logout");
        let mut session = Session::init(&ws);
        session.login(Role::Student, None).expect("login");
        session.logout().expect("logout");
        assert_eq!(session.identity(), None);
        assert_eq!(SessionStore::new(&ws).restore(), None);
        let _ = std::fs::remove_dir_all(ws);
    }
}
