//! Tipo de erro unificado do motor de bonding com formatação estável.
use core::fmt;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::bonding::error_catalog::{default_locale_message, BondingErrorCode};

const CONTEXT_VALUE_MAX: usize = 256;

/// Valor de contexto numa linha só, com no máximo `CONTEXT_VALUE_MAX` chars.
fn sanitize_value(input: &str) -> String {
    let flat = input.replace(['\n', '\r', '\t'], " ");
    match flat.char_indices().nth(CONTEXT_VALUE_MAX - 1) {
        Some((cut, _)) if flat.chars().count() > CONTEXT_VALUE_MAX => format!("{}…", &flat[..cut]),
        _ => flat,
    }
}

/// Troca `{chave}` pelo valor do contexto; placeholders sem valor ficam como estão.
fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    context
        .iter()
        .fold(template.to_owned(), |acc, (key, value)| acc.replace(&format!("{{{key}}}"), value))
}

#[derive(Serialize)]
struct LogRecord<'a> {
    code: &'static str,
    title: &'static str,
    message: String,
    context: &'a BTreeMap<String, String>,
}

/// Erro do motor de bonding com contexto estruturado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondingError {
    pub code: BondingErrorCode,
    pub context: BTreeMap<String, String>,
}

impl BondingError {
    /// Cria um novo erro sem contexto adicional.
    pub fn new(code: BondingErrorCode) -> Self {
        Self {
            code,
            context: BTreeMap::new(),
        }
    }

    /// Adiciona um par chave/valor ao contexto.
    pub fn with_context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        let key_string = key.into();
        if !key_string.is_empty() {
            let sanitized = sanitize_value(&value.to_string());
            self.context.insert(key_string, sanitized);
        }
        self
    }

    /// Atalho para comparar o código.
    pub fn is(&self, code: BondingErrorCode) -> bool {
        self.code == code
    }

    fn resolved_message(&self) -> String {
        let template = default_locale_message(self.code);
        render_template(template, &self.context)
    }

    /// Mensagem curta para UI.
    pub fn to_user_string(&self) -> String {
        let message = self.resolved_message();
        format!("[{}] {}", self.code.code(), message)
    }

    /// Renderiza um template arbitrário usando o contexto atual.
    pub fn render_with_template(&self, template: &str) -> String {
        render_template(template, &self.context)
    }

    /// Linha JSON estável para logs: `code`, `title`, `message`, `context`.
    pub fn to_log_json(&self) -> String {
        let record = LogRecord {
            code: self.code.code(),
            title: self.code.title(),
            message: self.resolved_message(),
            context: &self.context,
        };
        serde_json::to_string(&record).unwrap_or_default()
    }
}

impl fmt::Display for BondingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_string())
    }
}

impl std::error::Error for BondingError {}

impl From<BondingErrorCode> for BondingError {
    fn from(code: BondingErrorCode) -> Self {
        BondingError::new(code)
    }
}

/// Resultado padrão para operações do motor.
pub type Result<T> = std::result::Result<T, BondingError>;

#[macro_export]
macro_rules! bonding_err {
  ($code:expr) => {{
    $crate::bonding::error::BondingError::new($code)
  }};
  ($code:expr, $($key:ident => $value:expr),+ $(,)?) => {{
    let mut err = $crate::bonding::error::BondingError::new($code);
    $(
      err = err.with_context(stringify!($key), $value);
    )+
    err
  }};
  ($code:expr, { $($key:expr => $value:expr),+ $(,)? }) => {{
    let mut err = $crate::bonding::error::BondingError::new($code);
    $(
      err = err.with_context($key, $value);
    )+
    err
  }};
}

#[macro_export]
macro_rules! bonding_bail {
  ($($tt:tt)*) => {
    return Err($crate::bonding_err!($($tt)*))
  };
}
