use strum_macros::{Display, EnumString};

/// Lifetime policy of a provider.
///
/// - **Default**: one instance for the lifetime of the container.
/// - **Request**: one instance per context identity (inbound request).
/// - **Transient**: one instance per consumer, per context identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Scope {
    #[default]
    #[strum(to_string = "default", serialize = "singleton")]
    Default,
    #[strum(to_string = "request")]
    Request,
    #[strum(to_string = "transient")]
    Transient,
}

impl Scope {
    pub fn is_request_or_transient(&self) -> bool {
        matches!(self, Scope::Request | Scope::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope() {
        assert_eq!(Scope::default(), Scope::Default);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("singleton".parse::<Scope>().unwrap(), Scope::Default);
        assert_eq!("DEFAULT".parse::<Scope>().unwrap(), Scope::Default);
        assert_eq!("Request".parse::<Scope>().unwrap(), Scope::Request);
        assert_eq!("transient".parse::<Scope>().unwrap(), Scope::Transient);
        assert!("invalid".parse::<Scope>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Scope::Default.to_string(), "default");
        assert_eq!(Scope::Request.to_string(), "request");
        assert_eq!(Scope::Transient.to_string(), "transient");
    }
}
