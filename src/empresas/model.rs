//! Empresa and obrigação acessória data model.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}.!#$%&'*+/=?^_`{|}~-]+@[\p{L}\p{N}](?:[\p{L}\p{N}-]*[\p{L}\p{N}])?(?:\.[\p{L}\p{N}](?:[\p{L}\p{N}-]*[\p{L}\p{N}])?)+$")
        .unwrap_or_else(|e| panic!("email regex must compile: {e}"))
});

/// A syntactically valid email address.
///
/// Validation happens on construction and on deserialization, so a request
/// body carrying a malformed address is rejected before reaching a handler.
/// Local part and domain may contain Unicode letters. The domain is stored
/// lowercased, so addresses differing only in domain case are the same email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Email(String);

/// Reason an email address was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value is not a valid email address: {0}")]
pub struct InvalidEmail(pub String);

impl Email {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidEmail> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.split('@').next().is_some_and(|local| {
            local.starts_with('.') || local.ends_with('.') || local.contains("..")
        }) || !EMAIL_RE.is_match(trimmed)
        {
            return Err(InvalidEmail(raw));
        }
        let (local, domain) = trimmed.split_at(trimmed.find('@').unwrap_or(trimmed.len()));
        Ok(Self(format!("{local}{}", domain.to_lowercase())))
    }

    /// Wrap an address read back from storage without validating it again.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Email::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Attribute set for creating or fully replacing an empresa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmpresa {
    pub nome: String,
    pub cnpj: String,
    pub endereco: String,
    pub email: Email,
    pub telefone: String,
}

/// A persisted empresa with its obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empresa {
    pub id: i64,
    pub nome: String,
    pub cnpj: String,
    pub endereco: String,
    pub email: Email,
    pub telefone: String,
    /// Owned obligations, ordered by id.
    #[serde(default)]
    pub obrigacoes: Vec<Obrigacao>,
}

/// Attribute set for creating an obrigação acessória.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewObrigacao {
    pub nome: String,
    /// Free-form recurrence, e.g. "mensal" or "anual".
    pub periodicidade: String,
}

/// A persisted obrigação acessória.
///
/// The owning empresa id is a storage-level foreign key and is not part of
/// the serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obrigacao {
    pub id: i64,
    pub nome: String,
    pub periodicidade: String,
}

/// Confirmation body returned by delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMessage {
    pub message: String,
}

impl DeleteMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        for ok in ["a@a.com", "contato@acme.com.br", "first.last+tag@sub.example.org"] {
            assert!(Email::parse(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn accepts_internationalized_addresses() {
        for ok in ["josé@exemplo.com.br", "contato@açaí.com.br", "joão.silva@empresa.com"] {
            assert!(Email::parse(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn lowercases_domain_only() {
        let email = Email::parse("Contato@ACME.Com.BR").unwrap();
        assert_eq!(email.as_str(), "Contato@acme.com.br");

        let email = Email::parse("x@AÇAÍ.com").unwrap();
        assert_eq!(email.as_str(), "x@açaí.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "plainaddress",
            "@no-local.com",
            "no-domain@",
            "no-tld@example",
            "two@@example.com",
            "spaces in@example.com",
            ".leading@example.com",
            "double..dot@example.com",
            "trailing@example.com.",
        ] {
            assert!(Email::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn email_deserialization_validates() {
        let ok: Email = serde_json::from_str(r#""a@a.com""#).unwrap();
        assert_eq!(ok.as_str(), "a@a.com");

        let err = serde_json::from_str::<Email>(r#""not-an-email""#).unwrap_err();
        assert!(err.to_string().contains("not a valid email"));
    }

    #[test]
    fn new_empresa_requires_every_field() {
        let missing_telefone = r#"{"nome":"Acme","cnpj":"123","endereco":"Rua 1","email":"a@a.com"}"#;
        assert!(serde_json::from_str::<NewEmpresa>(missing_telefone).is_err());
    }

    #[test]
    fn empresa_serializes_nested_obrigacoes() {
        let empresa = Empresa {
            id: 1,
            nome: "Acme".into(),
            cnpj: "123".into(),
            endereco: "Rua 1".into(),
            email: Email::parse("a@a.com").unwrap(),
            telefone: "111".into(),
            obrigacoes: vec![Obrigacao {
                id: 3,
                nome: "ICMS".into(),
                periodicidade: "mensal".into(),
            }],
        };
        let json = serde_json::to_value(&empresa).unwrap();
        assert_eq!(json["email"], "a@a.com");
        assert_eq!(json["obrigacoes"][0]["id"], 3);
        assert!(json["obrigacoes"][0].get("empresa_id").is_none());
    }
}
