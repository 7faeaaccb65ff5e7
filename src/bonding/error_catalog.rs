//! Catálogo imutável de erros do motor de bonding.
use core::fmt;

/// Código de erro do motor de bonding.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum BondingErrorCode {
    /// Configuração de curva ou de royalties inválida.
    ConfigValidationError,
    /// Tipo de curva desconhecido.
    UnsupportedCurveKind,
    /// Domínio numérico violado (sem raiz real, quantidade inválida...).
    ArithmeticDomainError,
    /// Nenhuma hierarquia liga os dois mints.
    NoRouteFound,
    /// Conta de origem de um hop inexistente.
    SourceAccountMissing,
    /// Estado on-ledger ausente ou ilegível.
    StateUnavailable,
    /// Curva congelada (ou ainda não ativa) para a operação.
    FrozenCurveError,
    /// Executor rejeitou a transação de um hop.
    ExecutionRejected,
}

impl BondingErrorCode {
    /// Código textual estável do erro.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigValidationError => "BND-0001",
            Self::UnsupportedCurveKind => "BND-0002",
            Self::ArithmeticDomainError => "BND-0003",
            Self::NoRouteFound => "BND-0004",
            Self::SourceAccountMissing => "BND-0005",
            Self::StateUnavailable => "BND-0006",
            Self::FrozenCurveError => "BND-0007",
            Self::ExecutionRejected => "BND-0008",
        }
    }

    /// Título curto em português.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::ConfigValidationError => "Configuração inválida",
            Self::UnsupportedCurveKind => "Curva não suportada",
            Self::ArithmeticDomainError => "Domínio aritmético",
            Self::NoRouteFound => "Rota inexistente",
            Self::SourceAccountMissing => "Conta de origem ausente",
            Self::StateUnavailable => "Estado indisponível",
            Self::FrozenCurveError => "Curva congelada",
            Self::ExecutionRejected => "Execução rejeitada",
        }
    }

    /// Mensagem base em português. `{chave}` é substituído pelo contexto.
    pub const fn message_pt(&self) -> &'static str {
        match self {
            Self::ConfigValidationError => "configuração rejeitada: {reason}",
            Self::UnsupportedCurveKind => "tipo de curva desconhecido: {kind}",
            Self::ArithmeticDomainError => "operação fora do domínio: {reason}",
            Self::NoRouteFound => "nenhuma rota entre {base} e {target}",
            Self::SourceAccountMissing => "conta de origem inexistente para {mint}",
            Self::StateUnavailable => "estado indisponível para {account}",
            Self::FrozenCurveError => "curva {curve} congelada para {side}",
            Self::ExecutionRejected => "execução do hop {hop} rejeitada",
        }
    }

    /// Retorna todas as variantes em ordem estável.
    pub fn all() -> &'static [BondingErrorCode] {
        const ALL: &[BondingErrorCode] = &[
            BondingErrorCode::ConfigValidationError,
            BondingErrorCode::UnsupportedCurveKind,
            BondingErrorCode::ArithmeticDomainError,
            BondingErrorCode::NoRouteFound,
            BondingErrorCode::SourceAccountMissing,
            BondingErrorCode::StateUnavailable,
            BondingErrorCode::FrozenCurveError,
            BondingErrorCode::ExecutionRejected,
        ];
        ALL
    }
}

impl fmt::Display for BondingErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Mensagem padrão na localidade ativa (pt-BR).
pub fn default_locale_message(code: BondingErrorCode) -> &'static str {
    code.message_pt()
}
