use std::io::Write;

use crate::{
    error::Result,
    overlap::Plan,
    store::{Removal, ReservationStore},
};

#[derive(Debug)]
pub struct Outcome {
    pub plan: Plan,
    /// `None` when nothing was written.
    pub removal: Option<Removal>,
}

/// Loads every machine reservation, prints the plan to `out` and removes the
/// reservations it marks, unless `dry_run` is set or there is nothing to remove.
#[tracing::instrument(skip(store, out), err)]
pub async fn run<S: ReservationStore, W: Write>(
    store: &S,
    dry_run: bool,
    out: &mut W,
) -> Result<Outcome> {
    let reservations = store.machine_reservations().await?;
    let plan = Plan::build(reservations);
    write!(out, "{plan}")?;
    out.flush()?;

    if plan.removed.is_empty() {
        return Ok(Outcome {
            plan,
            removal: None,
        });
    }

    if dry_run {
        writeln!(out, "Dry run: no reservations were removed.")?;
        return Ok(Outcome {
            plan,
            removal: None,
        });
    }

    let removal = store.remove(&plan.removed_ids()).await?;
    writeln!(
        out,
        "Unlinked {} enrolment(s) and {} participation(s), deleted {} reservation(s).",
        removal.enrolments_unlinked, removal.participations_unlinked, removal.reservations_deleted
    )?;

    Ok(Outcome {
        plan,
        removal: Some(removal),
    })
}
