//! Stats endpoint DTOs.

use std::collections::HashMap;

use serde::Serialize;

use crate::external::throttler::HostThrottleInfo;

#[derive(Debug, Serialize)]
pub struct CacheSizes {
    pub collection: usize,
    pub doulist: usize,
    pub imdb: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cache_size: CacheSizes,
    pub throttler_info: HashMap<String, HostThrottleInfo>,
}
