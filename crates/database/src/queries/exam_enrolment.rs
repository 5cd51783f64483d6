use deadpool_postgres::GenericClient;

use crate::Params;

const UNLINK_RESERVATIONS: &str =
    "UPDATE exam_enrolment SET reservation_id = NULL WHERE reservation_id = ANY($1::bigint[])";

/// Detaches every enrolment pointing at one of `reservation_ids`.
pub async fn unlink_reservations<C: GenericClient>(
    client: &C,
    reservation_ids: &[i64],
) -> Result<u64, tokio_postgres::Error> {
    let params: &Params = &[&reservation_ids];

    client.execute(UNLINK_RESERVATIONS, params).await
}
