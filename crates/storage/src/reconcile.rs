//! Keeps a bucket's design document in line with the desired views

use crate::{BucketHandle, StorageError};
use tracing::{debug, info, warn};
use viewsync_core::DesignDocument;

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No design document is configured
    Skipped,
    /// The registered document already matches
    Unchanged,
    /// Nothing was registered under the name; the document was written
    Created,
    /// The registered document differed; it was replaced
    Updated,
}

impl ReconcileOutcome {
    /// True when the pass wrote to the bucket
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
        };
        f.write_str(label)
    }
}

/// Converge the bucket's design document to `desired`.
///
/// Fetches the registered document and writes `desired` only when nothing is
/// registered or the registered one differs. A fetch failure other than
/// "not found" aborts the pass without writing.
///
/// Fetch and upsert are not atomic; a concurrent writer between the two can
/// be overwritten.
pub async fn reconcile(
    bucket: &dyn BucketHandle,
    desired: Option<&DesignDocument>,
) -> Result<ReconcileOutcome, StorageError> {
    let Some(desired) = desired.filter(|d| !d.name().is_empty() && !d.is_empty()) else {
        return Ok(ReconcileOutcome::Skipped);
    };

    debug!("Ensure that indexes exist in bucket [{}]", bucket.name());

    let outcome = match bucket.get_design_document(desired.name()).await {
        Ok(current) if current == *desired => {
            debug!(
                "Design document [{}] in bucket [{}] is up to date",
                desired.name(),
                bucket.name()
            );
            return Ok(ReconcileOutcome::Unchanged);
        }
        Ok(_) => {
            warn!(
                "Missing indexes in bucket [{}] for document [{}]",
                bucket.name(),
                desired.name()
            );
            ReconcileOutcome::Updated
        }
        Err(e) if e.is_not_found() => {
            debug!(
                "Design document in bucket [{}] for document [{}] should be created",
                bucket.name(),
                desired.name()
            );
            ReconcileOutcome::Created
        }
        Err(source) => {
            return Err(StorageError::Reconciliation {
                document: desired.name().to_string(),
                source,
            })
        }
    };

    bucket
        .upsert_design_document(desired)
        .await
        .map_err(|source| StorageError::Reconciliation {
            document: desired.name().to_string(),
            source,
        })?;

    info!(
        "Design document [{}] {} in bucket [{}] with {} views",
        desired.name(),
        outcome,
        bucket.name(),
        desired.views().len()
    );

    Ok(outcome)
}
