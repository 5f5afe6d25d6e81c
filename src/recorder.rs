use derive_new::new;
use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;

use crate::model::{validate_key, ResourceType, Timestamp, ValidationError, ViewRecord};
use crate::store::{Insertion, RecordStore, StoreError};
use crate::time::{Clock, DebounceWindow, SystemClock};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ViewError {
    #[snafu(display("invalid view: {source}"))]
    Validation {
        source: ValidationError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not reach view storage: {source}"))]
    Storage {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// What [ViewRecorder::record_view] did with a view event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// First view of the key, a record with an amount of one was created.
    Created,
    /// The debounce window had elapsed and the amount was incremented.
    Counted,
    /// The previous counted view is still inside the debounce window.
    Debounced,
}

/// Applies the debounce policy to incoming view events.
///
/// The recorder keeps no state of its own. The elapsed-time check and the increment are separate storage calls,
/// so callers racing on the same stale record may each count a view.
#[derive(Debug, Clone, new)]
pub struct ViewRecorder<S, C = SystemClock> {
    store: S,
    clock: C,
    window: DebounceWindow,
}

impl<S, C> ViewRecorder<S, C> {
    pub fn window(&self) -> DebounceWindow {
        self.window
    }
}

impl<S: RecordStore, C: Clock> ViewRecorder<S, C> {
    #[instrument(skip(self), err)]
    pub async fn record_view(
        &self, resource: &str, resource_type: ResourceType, user: &str,
    ) -> Result<ViewOutcome, ViewError> {
        validate_key(resource, user).context(ValidationSnafu)?;

        let now = self.clock.now();
        let existing = self
            .store
            .find_by_key(resource, user)
            .await
            .context(StorageSnafu)?;

        let view = match existing {
            Some(view) => view,
            None => {
                let inserted = self
                    .store
                    .insert(resource, resource_type, user, now)
                    .await
                    .context(StorageSnafu)?;

                match inserted {
                    Insertion::Created(_) => {
                        tracing::debug!("created view");
                        return Ok(ViewOutcome::Created);
                    }
                    Insertion::Duplicate => {
                        tracing::debug!("lost the creation race, falling back to increment");
                        let fresh = self
                            .store
                            .find_by_key(resource, user)
                            .await
                            .context(StorageSnafu)?;

                        match fresh {
                            Some(view) => view,
                            None => return Ok(ViewOutcome::Debounced),
                        }
                    }
                }
            }
        };

        self.count_if_elapsed(&view, now).await
    }

    async fn count_if_elapsed(
        &self, view: &ViewRecord, now: Timestamp,
    ) -> Result<ViewOutcome, ViewError> {
        if !self.window.has_elapsed(view.last_view_date, now) {
            tracing::debug!(last_view_date = %view.last_view_date, "view debounced");
            return Ok(ViewOutcome::Debounced);
        }

        self.store
            .increment_amount(&view.resource, &view.user, now)
            .await
            .context(StorageSnafu)?;

        tracing::debug!(amount = view.amount + 1, "counted view");
        Ok(ViewOutcome::Counted)
    }
}
