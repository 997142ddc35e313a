use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: Uuid },
    #[error("unknown pipeline stage {0:?}")]
    UnknownStage(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl StoreError {
    pub(crate) fn not_found(collection: &'static str, id: Uuid) -> Self {
        Self::NotFound { collection, id }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What the board surfaces to the user.
///
/// `Load` puts the whole view into its failed state with a retry affordance.
/// The others are transient notices and leave the board as it was.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Failed to load pipeline data")]
    Load(#[source] StoreError),
    #[error("Failed to update deal stage")]
    Update(#[source] StoreError),
    #[error("Failed to save deal")]
    Save(#[source] StoreError),
    #[error("Failed to delete deal")]
    Delete(#[source] StoreError),
}

impl CrmError {
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Load(err) | Self::Update(err) | Self::Save(err) | Self::Delete(err) => err,
        }
    }

    pub fn into_store_error(self) -> StoreError {
        match self {
            Self::Load(err) | Self::Update(err) | Self::Save(err) | Self::Delete(err) => err,
        }
    }
}
