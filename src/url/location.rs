use crate::{ConfigError, ConfigResult};
use url::Url;

/// Countries the directory serves listings for
const SUPPORTED_COUNTRIES: &[&str] = &["us", "ca"];

/// Search location given on the command line
///
/// Blank strings are treated the same as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub state: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

impl Location {
    pub fn zip(zip: impl Into<String>) -> Self {
        Self {
            zip: Some(zip.into()),
            ..Self::default()
        }
    }

    pub fn county(state: impl Into<String>, county: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            county: Some(county.into()),
            ..Self::default()
        }
    }

    pub fn city(state: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            city: Some(city.into()),
            ..Self::default()
        }
    }

    /// Path segments under `/<country>/therapists/`, by precedence:
    /// zip alone, then state + county, then state + city
    pub fn segments(&self) -> ConfigResult<Vec<String>> {
        let state = slug(&self.state)?;
        let county = slug(&self.county)?;
        let city = slug(&self.city)?;
        let zip = slug(&self.zip)?;

        if let Some(county) = &county {
            if !county.ends_with("-county") {
                return Err(ConfigError::MalformedCounty(county.clone()));
            }
        }

        match (zip, state, county, city) {
            (Some(zip), _, _, _) => Ok(vec![zip]),
            (None, Some(state), Some(county), _) => Ok(vec![state, county]),
            (None, Some(state), None, Some(city)) => Ok(vec![state, city]),
            _ => Err(ConfigError::InsufficientLocation),
        }
    }
}

/// Checks that the country code is one the directory serves
pub fn validate_country(country: &str) -> ConfigResult<()> {
    if SUPPORTED_COUNTRIES.contains(&country) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedCountry(country.to_string()))
    }
}

/// Composes the crawl start URL for a location
///
/// # Examples
///
/// ```
/// use psych::url::{build_start_url, Location};
///
/// let url = build_start_url("https://www.psychologytoday.com", "us", &Location::zip("98101")).unwrap();
/// assert_eq!(url.as_str(), "https://www.psychologytoday.com/us/therapists/98101");
///
/// let url = build_start_url(
///     "https://www.psychologytoday.com",
///     "us",
///     &Location::county("wa", "king-county"),
/// )
/// .unwrap();
/// assert_eq!(url.as_str(), "https://www.psychologytoday.com/us/therapists/wa/king-county");
/// ```
pub fn build_start_url(base_url: &str, country: &str, location: &Location) -> ConfigResult<Url> {
    let country = country.trim().to_lowercase();
    validate_country(&country)?;

    let segments = location.segments()?;

    let mut url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| ConfigError::InvalidUrl(format!("base_url '{}' cannot have a path", base_url)))?
        .pop_if_empty()
        .push(&country)
        .push("therapists")
        .extend(segments.iter());

    Ok(url)
}

/// Trims and lowercases a location value, rejecting characters that would
/// not survive as a single path segment
fn slug(value: &Option<String>) -> ConfigResult<Option<String>> {
    let Some(raw) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let slug = raw.to_lowercase();
    if !slug.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "location value '{}' may only contain letters, digits and hyphens",
            raw
        )));
    }

    Ok(Some(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.psychologytoday.com";

    #[test]
    fn test_zip_alone() {
        let url = build_start_url(BASE, "us", &Location::zip("98101")).unwrap();
        assert_eq!(url.as_str(), "https://www.psychologytoday.com/us/therapists/98101");
    }

    #[test]
    fn test_state_and_county() {
        let url = build_start_url(BASE, "us", &Location::county("wa", "king-county")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.psychologytoday.com/us/therapists/wa/king-county"
        );
    }

    #[test]
    fn test_state_and_city() {
        let url = build_start_url(BASE, "us", &Location::city("wa", "seattle")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.psychologytoday.com/us/therapists/wa/seattle"
        );
    }

    #[test]
    fn test_no_parameters_is_error() {
        let result = build_start_url(BASE, "us", &Location::default());
        assert!(matches!(result, Err(ConfigError::InsufficientLocation)));
    }

    #[test]
    fn test_state_alone_is_error() {
        let location = Location {
            state: Some("wa".to_string()),
            ..Location::default()
        };
        assert!(matches!(
            build_start_url(BASE, "us", &location),
            Err(ConfigError::InsufficientLocation)
        ));
    }

    #[test]
    fn test_zip_takes_precedence() {
        let location = Location {
            state: Some("wa".to_string()),
            city: Some("seattle".to_string()),
            zip: Some("98101".to_string()),
            ..Location::default()
        };
        let url = build_start_url(BASE, "us", &location).unwrap();
        assert_eq!(url.path(), "/us/therapists/98101");
    }

    #[test]
    fn test_county_takes_precedence_over_city() {
        let location = Location {
            state: Some("wa".to_string()),
            county: Some("king-county".to_string()),
            city: Some("seattle".to_string()),
            zip: None,
        };
        let url = build_start_url(BASE, "us", &location).unwrap();
        assert_eq!(url.path(), "/us/therapists/wa/king-county");
    }

    #[test]
    fn test_blank_values_are_absent() {
        let location = Location {
            zip: Some("   ".to_string()),
            ..Location::city("WA", "Seattle")
        };
        let url = build_start_url(BASE, "us", &location).unwrap();
        assert_eq!(url.path(), "/us/therapists/wa/seattle");
    }

    #[test]
    fn test_malformed_county() {
        let result = build_start_url(BASE, "us", &Location::county("wa", "king"));
        assert!(matches!(result, Err(ConfigError::MalformedCounty(_))));
    }

    #[test]
    fn test_invalid_country() {
        let result = build_start_url(BASE, "uk", &Location::zip("98101"));
        assert!(matches!(result, Err(ConfigError::UnsupportedCountry(_))));
    }

    #[test]
    fn test_canada() {
        let url = build_start_url(BASE, "CA", &Location::city("bc", "vancouver")).unwrap();
        assert_eq!(url.path(), "/ca/therapists/bc/vancouver");
    }

    #[test]
    fn test_rejects_path_characters() {
        let result = build_start_url(BASE, "us", &Location::zip("98101/../admin"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let url = build_start_url("https://www.psychologytoday.com/", "us", &Location::zip("98101"))
            .unwrap();
        assert_eq!(url.as_str(), "https://www.psychologytoday.com/us/therapists/98101");
    }
}
