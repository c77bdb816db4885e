use sysinfo::{System, SystemExt};

/// Host facts resolved once at startup and reused verbatim by every tick.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    pub hostname: String,
    pub os_type: String,
    pub os_version: String,
    pub agent_version: String,
}

impl HostIdentity {
    pub fn resolve(system: &System) -> Self {
        Self {
            hostname: sanitize_hostname(
                &system
                    .host_name()
                    .unwrap_or_else(|| "unknown-host".to_string()),
            ),
            os_type: system
                .name()
                .unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: system
                .os_version()
                .unwrap_or_else(|| "unknown".to_string()),
            agent_version: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The hostname feeds ledger columns and log file names, so it must stay
/// free of the CSV delimiter.
fn sanitize_hostname(raw: &str) -> String {
    raw.replace(',', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_commas_never_reach_the_sinks() {
        assert_eq!(sanitize_hostname("host,with,commas"), "host-with-commas");
        assert_eq!(sanitize_hostname("plain-host"), "plain-host");
    }

    #[test]
    fn resolve_never_leaves_fields_empty() {
        let identity = HostIdentity::resolve(&System::new());
        assert!(!identity.hostname.is_empty());
        assert!(!identity.os_type.is_empty());
        assert!(!identity.os_version.is_empty());
        assert!(identity.agent_version.starts_with("healthmon "));
    }
}
