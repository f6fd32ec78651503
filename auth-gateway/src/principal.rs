use uuid::Uuid;

/// How a Bearer-authenticated principal was verified, kept around mainly so
/// handlers can restrict themselves to one kind (UserInfo accepts only
/// `Jwt`, per §4.7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Jwt,
    ApiKey,
}

/// The authenticated identity attached to a request, per §4.5 and the
/// source's dynamic request augmentation being replaced with an explicit
/// typed value instead of a mutated request object.
#[derive(Debug, Clone)]
pub enum Principal {
    None,
    Session {
        user_id: Uuid,
        email: String,
        session_id: String,
    },
    Bearer {
        user_id: Uuid,
        email: String,
        token_kind: TokenKind,
    },
}

impl Principal {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Principal::None => None,
            Principal::Session { user_id, .. } | Principal::Bearer { user_id, .. } => {
                Some(*user_id)
            }
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Principal::None => None,
            Principal::Session { email, .. } | Principal::Bearer { email, .. } => Some(email),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Principal::Session { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Principal::None)
    }
}
