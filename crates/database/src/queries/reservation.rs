use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::Row;

use crate::Params;

#[derive(Debug, Clone, PartialEq)]
pub struct GetOnMachines {
    pub id: i64,
    pub machine_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub participation_id: Option<i64>,
}

impl TryFrom<&Row> for GetOnMachines {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get(0)?,
            machine_id: row.try_get(1)?,
            start_at: row.try_get(2)?,
            end_at: row.try_get(3)?,
            participation_id: row.try_get(4)?,
        })
    }
}

// A reservation is referenced by at most one participation, but min() keeps
// the row count at one per reservation if the data says otherwise.
const GET_ON_MACHINES: &str = "SELECT r.id::bigint, r.machine_id::bigint, \
     r.start_at::timestamptz, r.end_at::timestamptz, \
     (SELECT min(ep.id)::bigint FROM exam_participation ep WHERE ep.reservation_id = r.id) \
     FROM reservation r \
     WHERE r.machine_id IS NOT NULL \
     ORDER BY r.machine_id, r.start_at";

/// Every reservation assigned to a machine, with its linked participation.
pub async fn get_on_machines<C: GenericClient>(
    client: &C,
) -> Result<Vec<GetOnMachines>, tokio_postgres::Error> {
    let params: &Params = &[];

    client
        .query(GET_ON_MACHINES, params)
        .await?
        .iter()
        .map(GetOnMachines::try_from)
        .collect()
}

const DELETE: &str = "DELETE FROM reservation WHERE id = ANY($1::bigint[])";

pub async fn delete<C: GenericClient>(
    client: &C,
    ids: &[i64],
) -> Result<u64, tokio_postgres::Error> {
    let params: &Params = &[&ids];

    client.execute(DELETE, params).await
}
