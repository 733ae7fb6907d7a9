//! Reverse geocoding against a Nominatim-compatible service.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::api::endpoints;
use crate::config::{AppConfig, ConfigError};
use crate::{AppError, ErrorKind, ValidatedCoordinate};

pub const REVERSE_ZOOM: u8 = 18;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("geocoder URL: {0}")]
    Config(#[from] ConfigError),

    #[error("geocoder response could not be parsed: {0}")]
    Parse(String),

    #[error("no address components for this position")]
    NoAddress,
}

impl From<GeocodeError> for AppError {
    fn from(e: GeocodeError) -> Self {
        AppError::new(ErrorKind::Geocoding, "Address not found. Please enter manually.")
            .with_internal(e.to_string())
    }
}

pub fn reverse_url(config: &AppConfig, at: ValidatedCoordinate) -> Result<Url, GeocodeError> {
    let mut url = config.geocoder_url(endpoints::REVERSE_GEOCODE)?;
    url.query_pairs_mut()
        .append_pair("format", "json")
        .append_pair("lat", &at.lat().to_string())
        .append_pair("lon", &at.lng().to_string())
        .append_pair("zoom", &REVERSE_ZOOM.to_string())
        .append_pair("addressdetails", "1");
    Ok(url)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReverseResponse {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub address: AddressComponents,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AddressComponents {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub pedestrian: Option<String>,
    pub highway: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub residential: Option<String>,
    pub village: Option<String>,
    pub amenity: Option<String>,
    pub shop: Option<String>,
    pub building: Option<String>,
    pub tourism: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
}

/// Location fields derived from a reverse lookup. Empty strings mean the
/// service had nothing for that field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressSuggestion {
    pub ward: String,
    pub landmark: String,
    pub address: String,
}

impl AddressSuggestion {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ward.is_empty() && self.landmark.is_empty() && self.address.is_empty()
    }
}

fn first_of<'a>(candidates: impl IntoIterator<Item = &'a Option<String>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .filter_map(Option::as_deref)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl From<&ReverseResponse> for AddressSuggestion {
    fn from(response: &ReverseResponse) -> Self {
        let a = &response.address;

        let ward = first_of([&a.neighbourhood, &a.suburb, &a.residential, &a.village]);
        let landmark = first_of([&response.name, &a.amenity, &a.shop, &a.building, &a.tourism]);

        let street = first_of([&a.road, &a.pedestrian, &a.highway]);
        let locality = first_of([&a.city, &a.town, &a.county]);
        let address = [first_of([&a.house_number]), street, locality]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            ward: ward.unwrap_or_default().to_string(),
            landmark: landmark.unwrap_or_default().to_string(),
            address,
        }
    }
}

pub fn parse_reverse(body: &[u8]) -> Result<AddressSuggestion, GeocodeError> {
    let response: ReverseResponse =
        serde_json::from_slice(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    let suggestion = AddressSuggestion::from(&response);
    if suggestion.is_empty() {
        return Err(GeocodeError::NoAddress);
    }
    Ok(suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_url() {
        let at = ValidatedCoordinate::new(12.9716, 77.5946).unwrap();
        let url = reverse_url(&AppConfig::default(), at).unwrap();
        assert_eq!(
            url.as_str(),
            "https://nominatim.openstreetmap.org/reverse?format=json&lat=12.9716&lon=77.5946&zoom=18&addressdetails=1"
        );
    }

    #[test]
    fn test_full_mapping() {
        let body = br#"{
            "name": "Cubbon Park",
            "address": {
                "house_number": "42",
                "road": "Kasturba Road",
                "neighbourhood": "Sampangi Rama Nagar",
                "suburb": "Shivajinagar",
                "city": "Bengaluru",
                "county": "Bangalore North"
            }
        }"#;
        let s = parse_reverse(body).unwrap();
        assert_eq!(s.ward, "Sampangi Rama Nagar");
        assert_eq!(s.landmark, "Cubbon Park");
        assert_eq!(s.address, "42, Kasturba Road, Bengaluru");
    }

    #[test]
    fn test_fallback_chain() {
        let body = br#"{
            "name": "",
            "address": {
                "pedestrian": "Church Street Walk",
                "village": "Hosahalli",
                "shop": "Corner Store",
                "town": "Anekal"
            }
        }"#;
        let s = parse_reverse(body).unwrap();
        assert_eq!(s.ward, "Hosahalli");
        assert_eq!(s.landmark, "Corner Store");
        assert_eq!(s.address, "Church Street Walk, Anekal");
    }

    #[test]
    fn test_missing_components_are_skipped() {
        let body = br#"{"address": {"county": "Bangalore Urban"}}"#;
        let s = parse_reverse(body).unwrap();
        assert_eq!(s.ward, "");
        assert_eq!(s.address, "Bangalore Urban");
    }

    #[test]
    fn test_empty_result_is_error() {
        assert_eq!(
            parse_reverse(br#"{"error":"Unable to geocode"}"#),
            Err(GeocodeError::NoAddress)
        );
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(parse_reverse(b"<html>"), Err(GeocodeError::Parse(_))));
    }

    #[test]
    fn test_error_maps_to_geocoding_kind() {
        let err: AppError = GeocodeError::NoAddress.into();
        assert_eq!(err.kind, ErrorKind::Geocoding);
        assert_eq!(err.user_facing_message(), "Address not found. Please enter manually.");
    }
}
