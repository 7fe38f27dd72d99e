//! End-to-end price forecast for one ticker
//!
//! Downloads daily history, engineers features, trains (or reloads) the
//! per-ticker LSTM, scores the validation windows and rolls the model forward
//! a few trading days. News sentiment for the ticker is scraped alongside and
//! reported next to the forecast.

use crate::api::{MarketDataProvider, Quote};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::features::{CLOSE_INDEX, FeatureFrame};
use crate::model::{LstmConfig, StockLstm, TrainOptions};
use crate::scaler::MinMaxScaler;
use crate::sentiment::{NewsScraper, NewsSentimentSummary};
use crate::window::{make_sequences, train_val_split};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use ndarray::{Array1, Array2, Array3, Axis, s};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Direction of the last forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// `Up` only when the final forecast is strictly above the one before it
    pub fn from_forecast(forecast: &[f64]) -> Option<Self> {
        match forecast {
            [.., prev, last] if last > prev => Some(Self::Up),
            [.., _, _] => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Chart series: validation dates followed by the forecast dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub dates: Vec<String>,
    /// Observed closes, `None` for forecast dates
    pub actual: Vec<Option<f64>>,
    pub predicted: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub prediction_text: String,
    pub final_predicted_price: f64,
    pub graph_data: GraphData,
    pub news_sentiment: NewsSentimentSummary,
}

/// Output of the blocking model stage
#[derive(Debug)]
struct Forecast {
    graph: GraphData,
    future: Vec<f64>,
}

/// Trains and applies per-ticker forecasting models
pub struct StockPredictor {
    provider: Arc<dyn MarketDataProvider>,
    config: StockConfig,
    news: Option<NewsScraper>,
}

impl StockPredictor {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: StockConfig) -> Self {
        let news = Some(NewsScraper::new(&config));
        Self {
            provider,
            config,
            news,
        }
    }

    /// Skip news scraping; the response carries an empty sentiment summary
    pub fn without_news(mut self) -> Self {
        self.news = None;
        self
    }

    /// Score news with a custom scraper
    pub fn with_news(mut self, scraper: NewsScraper) -> Self {
        self.news = Some(scraper);
        self
    }

    /// Forecast the next closes for `stock_name`
    pub async fn predict(&self, stock_name: &str) -> Result<PredictionResponse> {
        let requested = stock_name.trim().to_uppercase();
        if requested.is_empty() {
            return Err(StockError::InvalidSymbol("Stock name is required".to_string()));
        }

        tracing::info!(ticker = %requested, "starting analysis");
        let (ticker, quotes) = self.fetch_history(&requested).await?;

        let config = self.config.clone();
        let model_ticker = ticker.clone();
        let forecast = async move {
            tokio::task::spawn_blocking(move || run_forecast(&model_ticker, &quotes, &config)).await?
        };

        let query = format!("{ticker} stock");
        let news = async {
            let summary = match &self.news {
                Some(scraper) => {
                    tokio::time::timeout(self.config.scrape_timeout, scraper.summarize(&query))
                        .await
                        .unwrap_or_else(|_| {
                            tracing::warn!(query = %query, "news scrape timed out");
                            NewsSentimentSummary::default()
                        })
                }
                None => NewsSentimentSummary::default(),
            };
            Ok::<_, StockError>(summary)
        };

        // a failed forecast drops the pending scrape
        let (forecast, news_sentiment) = tokio::try_join!(forecast, news)?;

        let trend = Trend::from_forecast(&forecast.future).ok_or_else(|| {
            StockError::ModelError("Trend needs at least two forecast days".to_string())
        })?;
        let final_predicted_price = forecast.future.last().copied().unwrap_or_default();

        tracing::info!(
            ticker = %ticker,
            %trend,
            final_predicted_price,
            sentiment = news_sentiment.score,
            sentiment_label = news_sentiment.label(),
            "analysis complete"
        );

        Ok(PredictionResponse {
            status: "success".to_string(),
            prediction_text: format!("AI Analysis for {ticker}. Predicted trend: {trend}"),
            final_predicted_price,
            graph_data: forecast.graph,
            news_sentiment,
        })
    }

    /// History for `ticker`, falling back to its NSE listing when empty
    async fn fetch_history(&self, ticker: &str) -> Result<(String, Vec<Quote>)> {
        let start = self.config.history_start.and_time(NaiveTime::MIN).and_utc();
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let end = tomorrow.and_time(NaiveTime::MIN).and_utc();

        let quotes = self.download(ticker, start, end).await?;
        if !quotes.is_empty() {
            return Ok((ticker.to_string(), quotes));
        }

        let nse = format!("{ticker}.NS");
        tracing::info!(ticker, fallback = %nse, "no data, trying NSE listing");
        let quotes = self.download(&nse, start, end).await?;
        if !quotes.is_empty() {
            return Ok((nse, quotes));
        }

        Err(StockError::DataUnavailable {
            symbol: ticker.to_string(),
            reason: "Try adding .NS for Indian stocks.".to_string(),
        })
    }

    /// Provider lookups that fail without a transport error count as empty
    async fn download(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Quote>> {
        match self.provider.historical_quotes(symbol, start, end).await {
            Ok(quotes) => Ok(quotes),
            Err(StockError::YahooFinanceError(e)) => {
                tracing::debug!(symbol, error = %e, "no history returned");
                Ok(Vec::new())
            }
            Err(e @ StockError::DownloadFailed(_)) => Err(e),
            Err(e) => Err(StockError::DownloadFailed(e.to_string())),
        }
    }
}

/// CPU-bound part of a prediction
fn run_forecast(ticker: &str, quotes: &[Quote], config: &StockConfig) -> Result<Forecast> {
    let frame = FeatureFrame::from_quotes(quotes)?;
    let mut scaler = MinMaxScaler::new();
    let scaled = scaler.fit_transform(&frame.rows)?;

    let seq_len = config.seq_len;
    let (x, y) = make_sequences(&scaled, seq_len, CLOSE_INDEX);
    let split = train_val_split(y.len(), config.train_ratio);
    if y.is_empty() || split == 0 {
        return Err(StockError::InsufficientData {
            rows: frame.len(),
            required: seq_len + 1,
        });
    }

    let lstm_config = LstmConfig::new(frame.n_features(), config.hidden_size).with_dropout(config.dropout);
    let x_train = x.slice(s![..split, .., ..]).to_owned();
    let y_train = y.slice(s![..split]).to_owned();
    let model = load_or_train(ticker, &lstm_config, &x_train, &y_train, config)?;

    let x_val = x.slice(s![split.., .., ..]).to_owned();
    let y_val = y.slice(s![split..]).to_owned();
    let predicted_val = scaler.inverse_transform_column(CLOSE_INDEX, &model.predict(&x_val)?)?;
    let actual_val = scaler.inverse_transform_column(CLOSE_INDEX, &y_val)?;

    let last_window = x.index_axis(Axis(0), y.len() - 1).to_owned();
    let future_scaled = roll_forward(&model, last_window, config.future_days)?;
    let future = future_scaled
        .iter()
        .map(|v| scaler.inverse_value(CLOSE_INDEX, *v))
        .collect::<Result<Vec<_>>>()?;

    let val_start = seq_len + split;
    let val_dates = &frame.dates[val_start..val_start + y_val.len()];

    let mut dates: Vec<String> = val_dates.iter().map(|d| d.format(DATE_FORMAT).to_string()).collect();
    let mut actual: Vec<Option<f64>> = actual_val.iter().copied().map(Some).collect();
    let mut predicted = predicted_val.to_vec();

    if let Some(&last) = val_dates.last() {
        let mut cursor = last;
        for price in &future {
            cursor = next_trading_day(cursor);
            dates.push(cursor.format(DATE_FORMAT).to_string());
            actual.push(None);
            predicted.push(*price);
        }
    }

    Ok(Forecast {
        graph: GraphData {
            dates,
            actual,
            predicted,
        },
        future,
    })
}

/// Reuse a compatible saved model, otherwise train and persist a new one
fn load_or_train(
    ticker: &str,
    lstm_config: &LstmConfig,
    x_train: &Array3<f64>,
    y_train: &Array1<f64>,
    config: &StockConfig,
) -> Result<StockLstm> {
    let path = config.model_path(ticker);
    if path.exists() {
        match StockLstm::load(&path, lstm_config) {
            Ok(model) => {
                tracing::info!(ticker, path = %path.display(), "loaded saved model");
                return Ok(model);
            }
            Err(e) => tracing::warn!(ticker, error = %e, "saved model unusable, retraining"),
        }
    }

    let mut model = StockLstm::new(lstm_config.clone())?;
    tracing::info!(
        ticker,
        windows = y_train.len(),
        epochs = config.epochs,
        parameters = model.parameter_count(),
        "training new model"
    );
    let options = TrainOptions {
        epochs: config.epochs,
        learning_rate: config.learning_rate,
        ..TrainOptions::default()
    };
    let history = model.train(x_train, y_train, &options)?;
    tracing::debug!(ticker, final_loss = history.last().copied().unwrap_or_default(), "training finished");

    if let Err(e) = model.save(&path) {
        tracing::warn!(ticker, path = %path.display(), error = %e, "failed to save model");
    }

    Ok(model)
}

/// Predict `days` scaled closes, feeding each prediction back as the Close of
/// a copy of the window's last row
fn roll_forward(model: &StockLstm, mut window: Array2<f64>, days: usize) -> Result<Vec<f64>> {
    let seq_len = window.nrows();
    let mut out = Vec::with_capacity(days);

    for _ in 0..days {
        let input = window.clone().insert_axis(Axis(0));
        let next = model.predict(&input)?.first().copied().ok_or_else(|| {
            StockError::ModelError("Model returned no prediction".to_string())
        })?;
        out.push(next);

        if seq_len == 0 {
            continue;
        }
        let mut row = window.row(seq_len - 1).to_owned();
        row[CLOSE_INDEX] = next;
        for r in 0..seq_len - 1 {
            let shifted = window.row(r + 1).to_owned();
            window.row_mut(r).assign(&shifted);
        }
        window.row_mut(seq_len - 1).assign(&row);
    }

    Ok(out)
}

/// Next calendar day, moved past Saturday and Sunday
pub fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let next = date + Duration::days(1);
    match next.weekday() {
        Weekday::Sat => next + Duration::days(2),
        Weekday::Sun => next + Duration::days(1),
        _ => next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::api::provider::bar;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tokio_test::{assert_err, assert_ok};

    /// `days` weekday bars starting Monday 2024-01-01
    fn series(symbol: &str, days: usize) -> Vec<Quote> {
        let mut out = Vec::with_capacity(days);
        let mut day = Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap();
        while out.len() < days {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let i = out.len() as f64;
                out.push(bar(symbol, day, 100.0 + i * 0.5 + (i / 3.0).sin() * 4.0));
            }
            day += Duration::days(1);
        }
        out
    }

    fn test_config(name: &str) -> (StockConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("vision-predictor-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = StockConfig::builder()
            .seq_len(10)
            .hidden_size(4)
            .epochs(2)
            .model_dir(&dir)
            .build()
            .unwrap();
        (config, dir)
    }

    fn predictor(mock: MockMarketDataProvider, config: StockConfig) -> StockPredictor {
        StockPredictor::new(Arc::new(mock), config).without_news()
    }

    #[test]
    fn test_next_trading_day() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(next_trading_day(d(2024, 1, 4)), d(2024, 1, 5)); // Thu -> Fri
        assert_eq!(next_trading_day(d(2024, 1, 5)), d(2024, 1, 8)); // Fri -> Mon
        assert_eq!(next_trading_day(d(2024, 1, 6)), d(2024, 1, 8)); // Sat -> Mon
    }

    #[test]
    fn test_trend() {
        assert_eq!(Trend::from_forecast(&[1.0, 2.0, 3.0]), Some(Trend::Up));
        assert_eq!(Trend::from_forecast(&[3.0, 2.0, 2.0]), Some(Trend::Down));
        assert_eq!(Trend::from_forecast(&[5.0]), None);
        assert_eq!(Trend::Up.to_string(), "UP");
    }

    #[tokio::test]
    async fn test_predict_builds_graph() {
        let (config, dir) = test_config("graph");
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .times(1)
            .returning(|symbol, _, _| Ok(series(symbol, 40)));

        let response = assert_ok!(predictor(mock, config.clone()).predict(" aapl ").await);

        // 30 windows -> 24 train, 6 validation, plus 3 forecast days
        let graph = &response.graph_data;
        assert_eq!(response.status, "success");
        assert_eq!(graph.dates.len(), 9);
        assert_eq!(graph.predicted.len(), 9);
        assert_eq!(graph.actual.iter().filter(|a| a.is_some()).count(), 6);
        assert!(graph.actual[6..].iter().all(Option::is_none));
        assert!((response.final_predicted_price - graph.predicted[8]).abs() < f64::EPSILON);
        assert!(response.prediction_text.starts_with("AI Analysis for AAPL. Predicted trend: "));

        // bar 39 is Fri 2024-02-23, forecasts land on the following weekdays
        assert_eq!(graph.dates[5], "2024-02-23");
        assert_eq!(&graph.dates[6..], ["2024-02-26", "2024-02-27", "2024-02-28"]);

        let trend = Trend::from_forecast(&graph.predicted[6..]).unwrap();
        assert!(response.prediction_text.ends_with(&trend.to_string()));
        assert!(config.model_path("AAPL").exists());
        assert_eq!(response.news_sentiment, NewsSentimentSummary::default());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_reuses_saved_model_and_replaces_corrupt_one() {
        let (config, dir) = test_config("reuse");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(config.model_path("MSFT"), b"garbage").unwrap();

        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .times(2)
            .returning(|symbol, _, _| Ok(series(symbol, 30)));
        let predictor = predictor(mock, config.clone());

        predictor.predict("MSFT").await.unwrap();
        let saved = std::fs::read(config.model_path("MSFT")).unwrap();
        assert_ne!(saved, b"garbage");

        // second run loads the saved model instead of retraining
        let first = predictor.predict("MSFT").await.unwrap();
        let second_saved = std::fs::read(config.model_path("MSFT")).unwrap();
        assert_eq!(saved, second_saved);
        assert_eq!(first.graph_data.predicted.len(), first.graph_data.dates.len());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_falls_back_to_nse_listing() {
        let (config, dir) = test_config("nse");
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes().returning(|symbol, _, _| match symbol {
            "TCS" => Err(StockError::YahooFinanceError("no data".to_string())),
            "TCS.NS" => Ok(series(symbol, 30)),
            _ => Ok(Vec::new()),
        });

        let response = predictor(mock, config.clone()).predict("tcs").await.unwrap();
        assert!(response.prediction_text.starts_with("AI Analysis for TCS.NS."));
        assert!(config.model_path("TCS.NS").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_no_data_anywhere() {
        let (config, dir) = test_config("nodata");
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .times(2)
            .returning(|_, _, _| Ok(Vec::new()));

        let err = predictor(mock, config).predict("ZZZZ").await.unwrap_err();
        assert_eq!(err.to_string(), "No data found for ZZZZ. Try adding .NS for Indian stocks.");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_download_failure() {
        let (config, dir) = test_config("download");
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .times(1)
            .returning(|_, _, _| Err(StockError::DownloadFailed("connection reset".to_string())));

        let err = predictor(mock, config).predict("AAPL").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download stock data: connection reset");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_not_enough_data() {
        let (config, dir) = test_config("short");
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .returning(|symbol, _, _| Ok(series(symbol, 10)));

        let err = predictor(mock, config).predict("NEW").await.unwrap_err();
        assert_eq!(err.to_string(), "Not enough data to train.");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let (config, _) = test_config("empty");
        let mock = MockMarketDataProvider::new();
        let err = assert_err!(predictor(mock, config).predict("   ").await);
        assert!(matches!(err, StockError::InvalidSymbol(_)));
    }

    fn unreachable_news(config: &StockConfig) -> NewsScraper {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        NewsScraper::new(config).with_base_url(format!("http://127.0.0.1:{port}/search"))
    }

    #[tokio::test]
    async fn test_news_failure_keeps_forecast() {
        let (config, dir) = test_config("news");
        let config = StockConfig {
            scrape_rate_limit: 1,
            ..config
        };
        let mut mock = MockMarketDataProvider::new();
        mock.expect_historical_quotes()
            .times(2)
            .returning(|symbol, _, _| Ok(series(symbol, 30)));
        let news = unreachable_news(&config);
        let predictor = StockPredictor::new(Arc::new(mock), config).with_news(news);

        let first = assert_ok!(predictor.predict("NVDA").await);
        assert_eq!(first.status, "success");
        assert_eq!(first.news_sentiment, NewsSentimentSummary::default());

        // quota spent: the second scrape is skipped rather than waited for
        let started = std::time::Instant::now();
        let second = assert_ok!(predictor.predict("NVDA").await);
        assert_eq!(second.status, "success");
        assert_eq!(second.news_sentiment, NewsSentimentSummary::default());
        assert!(started.elapsed() < std::time::Duration::from_secs(30));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_roll_forward_shifts_window() {
        let model = StockLstm::with_seed(LstmConfig::new(8, 3).with_dropout(0.0), 1).unwrap();
        let window = Array2::from_shape_fn((4, 8), |(r, c)| (r * 8 + c) as f64 / 32.0);
        let out = roll_forward(&model, window, 3).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
