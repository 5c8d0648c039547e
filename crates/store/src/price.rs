use crate::naming::{self, quote_ident};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, QueryBuilder, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tradekit_core::common::Symbol;
use tradekit_core::price::entity::{Asset, Bar, Broker};
use tradekit_core::store::error::StoreError;
use tradekit_core::store::port::{
    LoadHistoricalParams, PriceRepository, SaveHistoricalParams, SaveResult,
};

/// 资产表行：symbol, name, exchange, broker, tradable, asset_class, status, url_logo, pairs
type AssetRecord = (
    String,
    String,
    String,
    String,
    bool,
    String,
    String,
    Option<String>,
    Option<String>,
);

/// K 线表行：symbol, timestamp(ns), open, high, low, close, volume, vwap, trade_count
type BarRecord = (String, i64, f64, f64, f64, f64, f64, f64, Option<i64>);

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// # Summary
/// PriceRepository 的 SQLite 实现，采用 "一码一库、一周期一表" 策略。
///
/// # Invariants
/// * 数据库文件存储在 `base_path` 目录下，路径规则见 `naming`。
/// * 每次操作独立打开连接，结束 (包括出错) 时关闭，不做连接池缓存。
/// * 同一张表的替换操作经由 `locks` 串行化，读取不加锁。
/// * `locks` 只保留正在保存或等待保存的表，保存结束且无人等待时移除。
pub struct SqlitePriceRepository {
    broker: Broker,
    base_path: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SqlitePriceRepository {
    /// 在全局配置的数据根目录下创建存储实例。
    pub fn new(broker: Broker) -> Self {
        Self::with_root(broker, crate::config::get_root_dir())
    }

    /// 在指定根目录下创建存储实例，目录在首次保存时才创建。
    pub fn with_root(broker: Broker, root: impl Into<PathBuf>) -> Self {
        Self {
            broker,
            base_path: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn lock_key(path: &Path, table: &str) -> String {
        format!("{}::{}", path.display(), table)
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }

    /// 调用方已释放自己的 `Arc` 后调用；仅剩表内引用时移除该锁。
    fn release_lock(&self, key: &str) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// # Summary
/// 打开单个 SQLite 文件的连接。
///
/// # Logic
/// 1. `create = true` 时先创建父目录，并允许创建新文件。
/// 2. `create = false` 时文件不存在即返回 `NotFound`。
async fn open(path: &Path, create: bool) -> Result<SqliteConnection, StoreError> {
    if create {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::InitError(e.to_string()))?;
        }
    } else if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(StoreError::NotFound(path.display().to_string()));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    SqliteConnection::connect_with(&options)
        .await
        .map_err(db_err)
}

async fn close(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close sqlite connection: {}", e);
    }
}

async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, StoreError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;
    Ok(count > 0)
}

fn to_nanos(time: DateTime<Utc>) -> Result<i64, StoreError> {
    time.timestamp_nanos_opt()
        .ok_or_else(|| StoreError::InvalidData(format!("Timestamp out of range: {}", time)))
}

/// 过滤边界换算为纳秒；超出 i64 纳秒范围的边界收敛到 `i64::MIN` / `i64::MAX`。
fn bound_nanos(time: DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(if time.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// # Summary
/// 在单个事务内重建资产表并写入全部资产。
///
/// # Logic
/// 1. DROP + CREATE 资产表。
/// 2. 逐行 INSERT，主键冲突等错误会使事务回滚，旧表保持不变。
///
/// # Invariants
/// * 所有资产必须属于 `broker`，否则在开启事务前返回 `InvalidData`。
async fn replace_assets(
    conn: &mut SqliteConnection,
    broker: Broker,
    table: &str,
    assets: &[Asset],
) -> Result<u64, StoreError> {
    if let Some(other) = assets.iter().find(|a| a.broker != broker) {
        return Err(StoreError::InvalidData(format!(
            "Asset {} belongs to {}, not {}",
            other.symbol, other.broker, broker
        )));
    }
    let table = quote_ident(table);
    let mut tx = conn.begin().await.map_err(db_err)?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE {} (
            symbol TEXT NOT NULL PRIMARY KEY,
            name TEXT NOT NULL,
            exchange TEXT NOT NULL,
            broker TEXT NOT NULL,
            tradable INTEGER NOT NULL,
            asset_class TEXT NOT NULL,
            status TEXT NOT NULL,
            url_logo TEXT,
            pairs TEXT
        )
        "#,
        table
    ))
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    let insert = format!(
        "INSERT INTO {} (symbol, name, exchange, broker, tradable, asset_class, status, url_logo, pairs) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        table
    );
    let mut affected = 0;
    for asset in assets {
        affected += sqlx::query(&insert)
            .bind(&asset.symbol)
            .bind(&asset.name)
            .bind(&asset.exchange)
            .bind(asset.broker.as_str())
            .bind(asset.tradable)
            .bind(asset.asset_class.as_str())
            .bind(asset.status.as_str())
            .bind(&asset.url_logo)
            .bind(&asset.pairs)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();
    }

    tx.commit().await.map_err(db_err)?;
    Ok(affected)
}

/// 在单个事务内重建 K 线表并写入全部 K 线，约定同 `replace_assets`。
/// 每根 K 线的代码都必须等于 `symbol`。
async fn replace_bars(
    conn: &mut SqliteConnection,
    symbol: &Symbol,
    table: &str,
    bars: &[Bar],
) -> Result<u64, StoreError> {
    if let Some(other) = bars.iter().find(|b| b.symbol != symbol.as_str()) {
        return Err(StoreError::InvalidData(format!(
            "Bar for {} cannot be stored under {}",
            other.symbol, symbol
        )));
    }
    let table = quote_ident(table);
    let mut tx = conn.begin().await.map_err(db_err)?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE {} (
            symbol TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            open REAL NOT NULL,
            high REAL NOT NULL,
            low REAL NOT NULL,
            close REAL NOT NULL,
            volume REAL NOT NULL,
            vwap REAL NOT NULL,
            trade_count INTEGER,
            PRIMARY KEY (symbol, timestamp)
        )
        "#,
        table
    ))
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    let insert = format!(
        "INSERT INTO {} (symbol, timestamp, open, high, low, close, volume, vwap, trade_count) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        table
    );
    let mut affected = 0;
    for bar in bars {
        let trade_count = bar
            .trade_count
            .map(i64::try_from)
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("trade_count: {}", e)))?;
        affected += sqlx::query(&insert)
            .bind(&bar.symbol)
            .bind(to_nanos(bar.timestamp)?)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .bind(bar.vwap)
            .bind(trade_count)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();
    }

    tx.commit().await.map_err(db_err)?;
    Ok(affected)
}

async fn read_assets(conn: &mut SqliteConnection, table: &str) -> Result<Vec<Asset>, StoreError> {
    if !table_exists(conn, table).await? {
        return Err(StoreError::NotFound(format!("assets table {}", table)));
    }

    let records = sqlx::query_as::<_, AssetRecord>(&format!(
        "SELECT symbol, name, exchange, broker, tradable, asset_class, status, url_logo, pairs \
         FROM {} ORDER BY symbol ASC",
        quote_ident(table)
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    records
        .into_iter()
        .map(|r| {
            Ok(Asset {
                symbol: r.0,
                name: r.1,
                exchange: r.2,
                broker: r.3.parse().map_err(StoreError::InvalidData)?,
                tradable: r.4,
                asset_class: r.5.parse().map_err(StoreError::InvalidData)?,
                status: r.6.parse().map_err(StoreError::InvalidData)?,
                url_logo: r.7,
                pairs: r.8,
            })
        })
        .collect()
}

/// # Summary
/// 按参数读取 K 线。
///
/// # Logic
/// 1. 闭区间过滤条件以绑定参数拼接，各自可选。
/// 2. `ORDER BY timestamp DESC` 之后再 `LIMIT`，因此截取的是区间内最新的 N 根。
async fn read_bars(
    conn: &mut SqliteConnection,
    table: &str,
    params: &LoadHistoricalParams,
) -> Result<Vec<Bar>, StoreError> {
    if !table_exists(conn, table).await? {
        return Err(StoreError::NotFound(format!(
            "{} table {}",
            params.symbol(),
            table
        )));
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT symbol, timestamp, open, high, low, close, volume, vwap, trade_count FROM {}",
        quote_ident(table)
    ));
    let mut clause = " WHERE ";
    if let Some(start) = params.start() {
        qb.push(clause).push("timestamp >= ").push_bind(bound_nanos(start));
        clause = " AND ";
    }
    if let Some(end) = params.end() {
        qb.push(clause).push("timestamp <= ").push_bind(bound_nanos(end));
    }
    qb.push(" ORDER BY timestamp DESC");
    if let Some(limit) = params.limit() {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }

    let records = qb
        .build_query_as::<BarRecord>()
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;

    records
        .into_iter()
        .map(|r| {
            Ok(Bar {
                symbol: r.0,
                timestamp: DateTime::from_timestamp_nanos(r.1),
                open: r.2,
                high: r.3,
                low: r.4,
                close: r.5,
                volume: r.6,
                vwap: r.7,
                trade_count: r
                    .8
                    .map(u64::try_from)
                    .transpose()
                    .map_err(|e| StoreError::InvalidData(format!("trade_count: {}", e)))?,
            })
        })
        .collect()
}

#[async_trait]
impl PriceRepository for SqlitePriceRepository {
    fn broker(&self) -> Broker {
        self.broker
    }

    /// # Summary
    /// 整体替换该券商的资产表。
    ///
    /// # Logic
    /// 1. 获取该表的替换锁。
    /// 2. 打开 (必要时创建) `assets.db`，事务内重建并写入。
    /// 3. 任何故障都折叠为 `SaveResult::error`。
    async fn save_assets(&self, assets: &[Asset]) -> SaveResult {
        let path = naming::assets_db_path(&self.base_path);
        let table = naming::assets_table(self.broker);
        let key = Self::lock_key(&path, table);
        let lock = self.lock_for(&key);

        let result = {
            let _guard = lock.lock().await;
            async {
                let mut conn = open(&path, true).await?;
                let written = replace_assets(&mut conn, self.broker, table, assets).await;
                close(conn).await;
                written
            }
            .await
        };
        drop(lock);
        self.release_lock(&key);

        match &result {
            Ok(n) => info!(broker = %self.broker, rows = n, "Saved assets"),
            Err(e) => error!(broker = %self.broker, "Failed to save assets: {}", e),
        }
        result.into()
    }

    async fn load_assets(&self) -> Result<Vec<Asset>, StoreError> {
        let path = naming::assets_db_path(&self.base_path);
        let mut conn = open(&path, false).await?;
        let assets = read_assets(&mut conn, naming::assets_table(self.broker)).await;
        close(conn).await;
        assets
    }

    /// # Summary
    /// 整体替换 (broker, symbol, timeframe) 对应的 K 线表。
    ///
    /// # Logic
    /// 1. 由代码与周期推导文件路径与表名，并获取替换锁。
    /// 2. 事务内重建并写入；失败时事务回滚，旧数据保持不变。
    /// 3. 任何故障都折叠为 `SaveResult::error`。
    async fn save_historical(&self, params: &SaveHistoricalParams) -> SaveResult {
        let path = naming::bars_db_path(&self.base_path, self.broker, &params.symbol);
        let table = naming::bars_table(params.timeframe);
        let key = Self::lock_key(&path, &table);
        let lock = self.lock_for(&key);

        let result = {
            let _guard = lock.lock().await;
            async {
                let mut conn = open(&path, true).await?;
                let written =
                    replace_bars(&mut conn, &params.symbol, &table, &params.bars).await;
                close(conn).await;
                written
            }
            .await
        };
        drop(lock);
        self.release_lock(&key);

        match &result {
            Ok(n) => debug!(
                symbol = %params.symbol,
                timeframe = %params.timeframe,
                rows = n,
                "Saved bars"
            ),
            Err(e) => error!(
                symbol = %params.symbol,
                timeframe = %params.timeframe,
                "Failed to save bars: {}",
                e
            ),
        }
        result.into()
    }

    async fn load_historical(
        &self,
        params: &LoadHistoricalParams,
    ) -> Result<Vec<Bar>, StoreError> {
        let path = naming::bars_db_path(&self.base_path, self.broker, params.symbol());
        let table = naming::bars_table(params.timeframe());
        let mut conn = open(&path, false).await?;
        let bars = read_bars(&mut conn, &table, params).await;
        close(conn).await;
        bars
    }
}
