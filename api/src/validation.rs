use std::num::IntErrorKind;

use validator::{Validate, ValidationError};

use crate::config::{DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_RADIUS_METERS, MAX_LIMIT, MAX_RADIUS_METERS};
use crate::errors::AppError;
use crate::models::requests::NearbyQuery;

const MAX_MANUAL_CODE_LEN: usize = 16;

pub fn validate_lat(lat: impl std::borrow::Borrow<f64>) -> Result<(), ValidationError> {
    let lat = lat.borrow();
    if !lat.is_finite() || !(-90.0..=90.0).contains(lat) {
        return Err(ValidationError::new("latitude"));
    }
    Ok(())
}

pub fn validate_lng(lng: impl std::borrow::Borrow<f64>) -> Result<(), ValidationError> {
    let lng = lng.borrow();
    if !lng.is_finite() || !(-180.0..=180.0).contains(lng) {
        return Err(ValidationError::new("longitude"));
    }
    Ok(())
}

/// Canonical pagination / radius window. Every constructed value is already
/// validated, so consumers never re-check it.
#[derive(Debug, Clone, PartialEq, Validate)]
pub(crate) struct QueryDescriptor {
    #[validate(range(min = 1, message = "page must be an integer >= 1"))]
    pub page: u64,
    #[validate(range(min = 1, max = 100, message = "limit must be an integer between 1 and 100"))]
    pub limit: u64,
    pub radius_meters: f64,
    pub search_text: String,
    pub skip: u64,
}

/// Output of [`normalize_query`]: the descriptor plus the location hints that
/// feed the resolution chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedQuery {
    pub descriptor: QueryDescriptor,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub code: Option<String>,
}

/// Shared by every proximity endpoint; fails before any location work starts.
pub(crate) fn normalize_query(raw: &NearbyQuery) -> Result<NormalizedQuery, AppError> {
    let page = match parse_integer("page", raw.page.as_deref())? {
        Some(p) if p < 1 => return Err(AppError::Validation("page must be an integer >= 1".into())),
        Some(p) => p as u64,
        None => DEFAULT_PAGE,
    };
    let limit = match parse_integer("limit", raw.limit.as_deref())? {
        Some(l) if !(1..=MAX_LIMIT as i64).contains(&l) => {
            return Err(AppError::Validation(format!(
                "limit must be an integer between 1 and {MAX_LIMIT}"
            )))
        }
        Some(l) => l as u64,
        None => DEFAULT_LIMIT,
    };
    let radius_meters = parse_radius(raw.radius.as_deref())?;

    // Offsets are bound as BIGINT, so the window start must fit in an i64.
    let skip = (page - 1)
        .checked_mul(limit)
        .filter(|s| i64::try_from(*s).is_ok())
        .ok_or_else(|| AppError::Validation(format!("page {page} is out of range for limit {limit}")))?;

    let descriptor = QueryDescriptor {
        page,
        limit,
        radius_meters,
        search_text: raw.search.as_deref().unwrap_or_default().trim().to_string(),
        skip,
    };
    descriptor.validate()?;

    Ok(NormalizedQuery {
        descriptor,
        lng: parse_float("lng", raw.lng.as_deref())?,
        lat: parse_float("lat", raw.lat.as_deref())?,
        code: raw.code.clone(),
    })
}

/// Trimmed, upper-cased manual code, or `None` when it cannot be a code at all.
pub(crate) fn normalize_manual_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty()
        || code.len() > MAX_MANUAL_CODE_LEN
        || !code.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(code)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_integer(name: &str, value: Option<&str>) -> Result<Option<i64>, AppError> {
    present(value)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("{name} must be an integer, got '{v}'")))
        })
        .transpose()
}

/// Integer meters, clamped to `MAX_RADIUS_METERS`. Digit runs too large for an
/// i64 are clamped as well.
fn parse_radius(value: Option<&str>) -> Result<f64, AppError> {
    let Some(v) = present(value) else {
        return Ok(DEFAULT_RADIUS_METERS);
    };
    let digits = v.strip_prefix('+').unwrap_or(v);
    match v.parse::<i64>() {
        Ok(r) if r < 0 => Err(AppError::Validation("radius must be a non-negative integer".into())),
        Ok(r) => Ok((r as f64).min(MAX_RADIUS_METERS)),
        Err(e)
            if *e.kind() == IntErrorKind::PosOverflow
                && digits.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(MAX_RADIUS_METERS)
        }
        Err(_) => Err(AppError::Validation(format!("radius must be an integer, got '{v}'"))),
    }
}

fn parse_float(name: &str, value: Option<&str>) -> Result<Option<f64>, AppError> {
    present(value)
        .map(|v| {
            v.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| AppError::Validation(format!("{name} must be a number, got '{v}'")))
        })
        .transpose()
}
