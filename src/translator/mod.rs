use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    GitHub,
    Postgres,
    Redis,
    Sentry,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::GitHub,
        ServiceKind::Postgres,
        ServiceKind::Redis,
        ServiceKind::Sentry,
    ];

    pub fn parse(name: &str) -> Result<Self, UnknownServiceKind> {
        match name.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            "sentry" => Ok(Self::Sentry),
            _ => Err(UnknownServiceKind {
                name: name.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Postgres => "postgres",
            Self::Redis => "redis",
            Self::Sentry => "sentry",
        }
    }

    pub fn flag_name(self) -> &'static str {
        match self {
            Self::GitHub => "GITHUB_PAT",
            Self::Postgres => "POSTGRES_URL",
            Self::Redis => "REDIS_URL",
            Self::Sentry => "SENTRY_AUTH_TOKEN",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service type `{name}`")]
pub struct UnknownServiceKind {
    pub name: String,
}

/// One dependency handed to a composite process: a service kind name and its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub config: String,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
        }
    }

    /// Parses the `kind=value` form used on the command line.
    pub fn parse_assignment(raw: &str) -> Result<Self, String> {
        let (name, config) = raw
            .split_once('=')
            .ok_or_else(|| format!("service `{raw}` must use the form kind=value"))?;
        if name.trim().is_empty() {
            return Err(format!("service `{raw}` is missing a kind"));
        }
        Ok(Self::new(name.trim(), config))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFlag {
    pub kind: ServiceKind,
    pub value: String,
}

impl ServiceFlag {
    pub fn to_arg(&self) -> String {
        format!("--{}={}", self.kind.flag_name(), self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    pub flags: Vec<ServiceFlag>,
    pub unknown: Vec<UnknownServiceKind>,
}

impl FlagSet {
    pub fn args(&self) -> Vec<String> {
        self.flags.iter().map(ServiceFlag::to_arg).collect()
    }
}

pub fn translate(service: &ServiceConfig) -> Result<ServiceFlag, UnknownServiceKind> {
    let kind = ServiceKind::parse(&service.name)?;
    Ok(ServiceFlag {
        kind,
        value: service.config.clone(),
    })
}

/// Translates services in order; unrecognized kinds are collected, not fatal.
pub fn translate_services(services: &[ServiceConfig]) -> FlagSet {
    let mut set = FlagSet::default();
    for service in services {
        match translate(service) {
            Ok(flag) => set.flags.push(flag),
            Err(unknown) => set.unknown.push(unknown),
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_aliases_map_to_the_same_flag_case_insensitively() {
        for name in ["Postgres", "postgresql", "POSTGRES", "PostgreSQL"] {
            let flag = translate(&ServiceConfig::new(name, "postgres://db")).expect("known kind");
            assert_eq!(flag.to_arg(), "--POSTGRES_URL=postgres://db");
        }
    }

    #[test]
    fn every_kind_has_a_distinct_flag() {
        let names: Vec<&str> = ServiceKind::ALL.iter().map(|k| k.flag_name()).collect();
        assert_eq!(
            names,
            vec!["GITHUB_PAT", "POSTGRES_URL", "REDIS_URL", "SENTRY_AUTH_TOKEN"]
        );
        for kind in ServiceKind::ALL {
            assert_eq!(ServiceKind::parse(kind.as_str()), Ok(kind));
        }
    }

    #[test]
    fn unknown_kinds_are_collected_and_skipped() {
        let set = translate_services(&[
            ServiceConfig::new("github", "tok1"),
            ServiceConfig::new("supabase", "key"),
            ServiceConfig::new("redis", "redis://x"),
        ]);
        assert_eq!(set.args(), vec!["--GITHUB_PAT=tok1", "--REDIS_URL=redis://x"]);
        assert_eq!(
            set.unknown,
            vec![UnknownServiceKind {
                name: "supabase".to_string()
            }]
        );
    }

    #[test]
    fn kind_names_are_not_trimmed() {
        assert!(ServiceKind::parse(" redis").is_err());
    }

    #[test]
    fn parse_assignment_splits_on_first_equals() {
        let service = ServiceConfig::parse_assignment("postgres=postgres://u:p@h/db?a=b")
            .expect("assignment");
        assert_eq!(service.name, "postgres");
        assert_eq!(service.config, "postgres://u:p@h/db?a=b");
        assert!(ServiceConfig::parse_assignment("redis").is_err());
        assert!(ServiceConfig::parse_assignment("=x").is_err());
    }
}
