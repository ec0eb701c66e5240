pub(crate) mod requests;
pub(crate) mod responses;

pub(crate) use requests::{CreateManualAddress, LocationUpdate, NearbyQuery, UpdateManualAddress};
pub(crate) use responses::{HealthPayload, ManualAddressPayload, NearbyPayload, UserLocationPayload};
