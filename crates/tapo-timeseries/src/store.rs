use crate::error::{Result, StoreError};
use crate::line::to_line_protocol;
use crate::model::DataPoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// 时序数据写入 trait
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// 写入单个数据点
    async fn write_point(&self, point: &DataPoint) -> Result<()>;
}

/// InfluxDB v2 连接参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

/// InfluxDB v2 HTTP 写入实现
pub struct InfluxStore {
    client: reqwest::Client,
    write_url: Url,
    token: String,
}

impl InfluxStore {
    pub fn new(config: &InfluxConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let mut write_url = Url::parse(&format!(
            "{}/api/v2/write",
            config.url.trim_end_matches('/')
        ))?;
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");

        info!(
            url = %config.url,
            org = %config.org,
            bucket = %config.bucket,
            "InfluxDB sink configured"
        );

        Ok(Self {
            client,
            write_url,
            token: config.token.clone(),
        })
    }

    pub fn write_url(&self) -> &str {
        self.write_url.as_str()
    }
}

#[async_trait]
impl TimeSeriesSink for InfluxStore {
    async fn write_point(&self, point: &DataPoint) -> Result<()> {
        let body = to_line_protocol(point)?;

        let response = self
            .client
            .post(self.write_url.clone())
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(measurement = %point.measurement, "Wrote data point");
        Ok(())
    }
}
