//! Tipos de erro do núcleo eleitoral.

use thiserror::Error;

/// Tipo de resultado padrão do núcleo eleitoral.
pub type EleitoralResult<T> = Result<T, EleitoralError>;

/// Erros possíveis nas operações do núcleo.
///
/// As quatro primeiras variantes são resultados de domínio, síncronos e locais
/// à chamada de transição. As demais representam falhas de infraestrutura e
/// são propagadas sem interpretação.
#[derive(Error, Debug)]
pub enum EleitoralError {
    #[error("{kind} '{id}' não encontrado(a)")]
    NotFound { kind: &'static str, id: String },

    #[error("Operação '{operation}' inválida para {kind} com status {status}")]
    InvalidTransition {
        kind: &'static str,
        status: String,
        operation: &'static str,
    },

    #[error("Validação falhou: {0}")]
    Validation(Violation),

    #[error("Conflito de concorrência em {kind} '{id}': versão esperada {expected}, recarregue e tente novamente")]
    ConcurrencyConflict {
        kind: &'static str,
        id: String,
        expected: u64,
    },

    #[error("Ator '{actor}' não apresentou a credencial exigida: {claim}")]
    Unauthorized { actor: String, claim: String },

    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de armazenamento: {0}")]
    Storage(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for EleitoralError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl EleitoralError {
    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Cria um erro de armazenamento.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Cria um erro de entidade não encontrada.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Cria um erro de transição inválida a partir do status atual.
    pub fn invalid_transition(
        kind: &'static str,
        status: impl std::fmt::Display,
        operation: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            kind,
            status: status.to_string(),
            operation,
        }
    }

    /// Indica se o chamador deve recarregar a entidade e tentar novamente.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Retorna a violação, se este for um erro de validação.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Violation> for EleitoralError {
    fn from(violation: Violation) -> Self {
        Self::Validation(violation)
    }
}

/// Invariante específica violada por uma operação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Motivo/justificativa obrigatório não informado.
    MissingReason,
    /// Cargo obrigatório sem titular aprovado (ou sem titular, na submissão).
    MandatoryRoleUnfilled(String),
    /// Cargo de titular único já ocupado.
    RoleAlreadyFilled(String),
    /// Membro não pertence à chapa.
    UnknownMember(String),
    /// Membro já presente na chapa.
    DuplicateMember(String),
    /// Lista de pendências documentais vazia.
    EmptyChecklist,
    /// Ainda existem impugnações abertas contra a chapa.
    OpenChallenges(usize),
    /// Fase da eleição não permite a operação.
    ElectionPhase(String),
    /// Manifestação apresentada após o prazo.
    LateSubmission { round: String },
    /// Prazo ainda não expirou (fechamento explícito prematuro).
    DeadlineNotElapsed { round: String },
    /// Prazo de recurso expirado.
    AppealWindowElapsed,
    /// Membro não integra o colegiado julgador.
    NotInDecidingBody(String),
    /// Membro já votou nesta sessão.
    DuplicateVote(String),
    /// Quórum não atingido.
    QuorumNotMet { cast: usize, required: usize },
    /// Empate sem regra de desempate: exige resolução explícita.
    UnresolvedTie,
    /// Voto de desempate não resolve a situação atual.
    TieBreakNotApplicable,
    /// Apuração incompleta: votos contados diferem do total declarado.
    CountIncomplete { counted: u64, total: u64 },
    /// Registro de voto de outra eleição.
    ForeignVoteRecord(String),
    /// Cédula desconhecida.
    UnknownBallot(String),
    /// Entidade possui dependentes e não pode ser excluída.
    HasDependents,
    /// Valor de parâmetro inválido.
    InvalidArgument(String),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingReason => write!(f, "motivo obrigatório não informado"),
            Violation::MandatoryRoleUnfilled(role) => {
                write!(f, "cargo obrigatório '{}' sem titular aprovado", role)
            }
            Violation::RoleAlreadyFilled(role) => write!(f, "cargo '{}' já possui titular", role),
            Violation::UnknownMember(id) => write!(f, "membro '{}' não encontrado", id),
            Violation::DuplicateMember(id) => write!(f, "membro '{}' já integra a chapa", id),
            Violation::EmptyChecklist => write!(f, "lista de documentos pendentes vazia"),
            Violation::OpenChallenges(n) => write!(f, "{} impugnação(ões) em aberto", n),
            Violation::ElectionPhase(phase) => {
                write!(f, "fase da eleição ({}) não permite a operação", phase)
            }
            Violation::LateSubmission { round } => {
                write!(f, "{} apresentada(s) após o prazo (intempestiva)", round)
            }
            Violation::DeadlineNotElapsed { round } => {
                write!(f, "prazo de {} ainda não expirou", round)
            }
            Violation::AppealWindowElapsed => write!(f, "prazo de recurso expirado"),
            Violation::NotInDecidingBody(id) => {
                write!(f, "membro '{}' não integra o colegiado", id)
            }
            Violation::DuplicateVote(id) => write!(f, "membro '{}' já votou nesta sessão", id),
            Violation::QuorumNotMet { cast, required } => {
                write!(f, "quórum não atingido ({} de {})", cast, required)
            }
            Violation::UnresolvedTie => write!(f, "empate sem regra de desempate"),
            Violation::TieBreakNotApplicable => write!(f, "não há empate a resolver"),
            Violation::CountIncomplete { counted, total } => {
                write!(f, "apuração incompleta ({} de {} votos)", counted, total)
            }
            Violation::ForeignVoteRecord(id) => {
                write!(f, "registro de voto '{}' pertence a outra eleição", id)
            }
            Violation::UnknownBallot(id) => write!(f, "cédula '{}' desconhecida", id),
            Violation::HasDependents => write!(f, "entidade possui dependentes"),
            Violation::InvalidArgument(msg) => write!(f, "argumento inválido: {}", msg),
        }
    }
}
