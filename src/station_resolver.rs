use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use tracing::{debug, error, info, instrument};

use crate::fetch_error::FetchError;

/// Identifier of a weather reporting station, e.g. `KHOU`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Station(pub String);

impl Station {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Geolookup payload: {location: {nearby_weather_stations: {airport: {station: [{icao}]}}}}
// Every level is optional so a missing field maps to a lookup error instead of a decode error.
#[derive(Debug, Deserialize)]
struct GeolookupResponse {
    location: Option<GeoLocation>,
}

#[derive(Debug, Deserialize)]
struct GeoLocation {
    nearby_weather_stations: Option<NearbyStations>,
}

#[derive(Debug, Deserialize)]
struct NearbyStations {
    airport: Option<AirportStations>,
}

#[derive(Debug, Deserialize)]
struct AirportStations {
    #[serde(default)]
    station: Vec<AirportStation>,
}

#[derive(Debug, Deserialize)]
struct AirportStation {
    icao: Option<String>,
}

/// Resolves postal codes to their nearest airport station
///
/// Results are cached per location for the lifetime of the resolver.
/// Distinct locations always trigger their own lookup.
#[derive(Clone)]
pub struct StationResolver {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: HashMap<String, Station>,
}

impl StationResolver {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            cache: HashMap::new(),
        }
    }

    /// Pre-seed the cache with a station the caller already knows
    pub fn with_station(mut self, location: &str, station: Station) -> Self {
        self.cache.insert(location.trim().to_string(), station);
        self
    }

    pub fn cached(&self, location: &str) -> Option<&Station> {
        self.cache.get(location.trim())
    }

    pub fn clear_cache(&mut self) {
        debug!("Clearing {} cached stations", self.cache.len());
        self.cache.clear();
    }

    pub fn lookup_url(&self, location: &str) -> String {
        format!(
            "{}/{}/geolookup/q/{}.json",
            self.base_url.trim_end_matches('/'),
            self.api_key,
            location
        )
    }

    #[instrument(skip(self))]
    pub async fn resolve(&mut self, location: &str) -> Result<Station, FetchError> {
        let location = location.trim();
        if let Some(station) = self.cache.get(location) {
            debug!("Using cached station {} for {}", station, location);
            return Ok(station.clone());
        }

        let station = self.lookup(location).await?;
        info!("Nearest station for {} is {}", location, station);
        self.cache.insert(location.to_string(), station.clone());
        Ok(station)
    }

    async fn lookup(&self, location: &str) -> Result<Station, FetchError> {
        let url = self.lookup_url(location);
        debug!("Sending geolookup request");
        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Geolookup request for {} failed: {}", location, e);
            FetchError::Lookup(format!("geolookup for {location} failed: {e}"))
        })?;
        let status = response.status();
        debug!("Received geolookup response with status: {}", status);

        if !status.is_success() {
            error!("Geolookup for {} returned status {}", location, status);
            return Err(FetchError::Lookup(format!(
                "geolookup for {location} returned status {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            FetchError::Lookup(format!("geolookup body for {location} unreadable: {e}"))
        })?;
        parse_station(&body).map_err(|e| {
            debug!(
                "Geolookup body preview (first 500 chars): {}",
                &body.chars().take(500).collect::<String>()
            );
            e
        })
    }
}

fn parse_station(body: &str) -> Result<Station, FetchError> {
    let payload: GeolookupResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Lookup(format!("unreadable geolookup payload: {e}")))?;

    let stations = payload
        .location
        .ok_or_else(|| FetchError::Lookup("payload has no 'location'".to_string()))?
        .nearby_weather_stations
        .ok_or_else(|| FetchError::Lookup("payload has no 'nearby_weather_stations'".to_string()))?
        .airport
        .ok_or_else(|| FetchError::Lookup("payload has no airport stations".to_string()))?
        .station;

    let icao = stations
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Lookup("no nearby airport stations".to_string()))?
        .icao
        .filter(|icao| !icao.trim().is_empty())
        .ok_or_else(|| FetchError::Lookup("first nearby station has no icao code".to_string()))?;

    Ok(Station(icao.trim().to_string()))
}
