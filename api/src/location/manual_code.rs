use rand::Rng;

use crate::config::MANUAL_CODE_MAX_ATTEMPTS;
use crate::errors::AppError;
use crate::repositories::{ManualAddressRecord, ManualAddressStore, NewManualAddress};

const PREFIX_LEN: usize = 3;
const DEFAULT_COUNTRY: &str = "India";

/// City prefix (three upper-case ASCII letters, `X`-padded) plus four random digits.
pub fn generate_manual_code<R: Rng + ?Sized>(city: &str, rng: &mut R) -> String {
    let mut prefix: String = city
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(PREFIX_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < PREFIX_LEN {
        prefix.push('X');
    }
    format!("{prefix}{:04}", rng.gen_range(0..10_000))
}

/// Insert a manual address under a freshly generated, unused code.
pub async fn create_manual_address(
    store: &dyn ManualAddressStore,
    mut input: NewManualAddress,
) -> Result<ManualAddressRecord, AppError> {
    input.city = input.city.trim().to_string();
    if input.city.is_empty() {
        return Err(AppError::Validation("city must not be empty".into()));
    }
    if input.country.trim().is_empty() {
        input.country = DEFAULT_COUNTRY.to_string();
    }

    for attempt in 1..=MANUAL_CODE_MAX_ATTEMPTS {
        let code = generate_manual_code(&input.city, &mut rand::thread_rng());
        if store.code_exists(&code).await? {
            log::debug!("manual code {code} taken (attempt {attempt})");
            continue;
        }
        match store.insert(&code, &input).await {
            Ok(record) => {
                log::info!("created manual address {} for {}", record.unique_code, record.city);
                return Ok(record);
            }
            // Lost a race with a concurrent insert of the same code.
            Err(AppError::Conflict(_)) => {
                log::debug!("manual code {code} taken on insert (attempt {attempt})");
            }
            Err(err) => return Err(err),
        }
    }

    Err(AppError::Conflict(format!(
        "could not allocate a free code for '{}' after {MANUAL_CODE_MAX_ATTEMPTS} attempts",
        input.city
    )))
}
