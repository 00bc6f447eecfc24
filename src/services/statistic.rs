//! Catalog statistics.

use std::sync::Arc;

use crate::models::Statistic;
use crate::ports::StationPort;

pub struct StatisticService {
    station_port: Arc<dyn StationPort>,
}

impl StatisticService {
    pub fn new(station_port: Arc<dyn StationPort>) -> Self {
        Self { station_port }
    }

    pub async fn get_statistic(&self, country_code: Option<&str>) -> anyhow::Result<Statistic> {
        self.station_port.get_statistic(country_code).await
    }
}
