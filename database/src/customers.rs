use crate::{
    consts::consts::WON_STAGE,
    model::customer::Customer,
    store::{table::filter::LeadQuery, LeadStore, StoreError, StoreResult},
};

/// Copies every won lead that has no customer yet, returns how many were created.
///
/// Running it twice creates nothing the second time. Customers of leads that later
/// left the `Won` stage are kept.
#[tracing::instrument(skip(store))]
pub fn sync_won_leads(store: &dyn LeadStore) -> StoreResult<usize> {
    let won = store.list(LeadQuery::stage(WON_STAGE))?;
    let mut inserted = 0;

    for lead in &won {
        match store.insert_customer(Customer::from_lead(lead)) {
            Ok(()) => inserted += 1,
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    log::info!("Customer sync: {} won leads, {} new customers", won.len(), inserted);

    Ok(inserted)
}
