use database::{deadpool_postgres::GenericClient, queries};

use crate::{error::Result, overlap::Reservation};

/// Rows touched by a removal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub enrolments_unlinked: u64,
    pub participations_unlinked: u64,
    pub reservations_deleted: u64,
}

pub trait ReservationStore {
    async fn machine_reservations(&self) -> Result<Vec<Reservation>>;

    /// Nulls every enrolment and participation reference to `ids`, then
    /// deletes the reservations themselves.
    async fn remove(&self, ids: &[i64]) -> Result<Removal>;
}

/// Store backed by a Postgres client or an open transaction. Committing is
/// left to whoever owns the transaction.
pub struct PgStore<'a, C> {
    client: &'a C,
}

impl<'a, C: GenericClient> PgStore<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

impl<C: GenericClient> ReservationStore for PgStore<'_, C> {
    #[tracing::instrument(skip_all, err)]
    async fn machine_reservations(&self) -> Result<Vec<Reservation>> {
        let reservations = queries::reservation::get_on_machines(self.client).await?;
        tracing::info!(count = reservations.len(), "Loaded machine reservations");

        Ok(reservations.into_iter().map(Reservation::from).collect())
    }

    #[tracing::instrument(skip(self), err)]
    async fn remove(&self, ids: &[i64]) -> Result<Removal> {
        let enrolments_unlinked =
            queries::exam_enrolment::unlink_reservations(self.client, ids).await?;
        let participations_unlinked =
            queries::exam_participation::unlink_reservations(self.client, ids).await?;
        let reservations_deleted = queries::reservation::delete(self.client, ids).await?;

        let removal = Removal {
            enrolments_unlinked,
            participations_unlinked,
            reservations_deleted,
        };
        tracing::info!(?removal, "Removed overlapping reservations");

        Ok(removal)
    }
}
