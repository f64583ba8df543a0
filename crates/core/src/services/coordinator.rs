use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::errors::CoreError;
use crate::models::account::Account;
use crate::models::dataset::SalesDataset;
use crate::storage::cache::DataCache;
use super::currency_service::CurrencyConverter;
use super::report_service::ReportService;

/// How long a completed fetch result is served from the data memo.
const DATA_MEMO_TTL: Duration = Duration::from_secs(5 * 60);

/// How long a credential-probe outcome is served from the check memo.
const CHECK_MEMO_TTL: Duration = Duration::from_secs(30);

/// Keys shorter than this cannot be valid key material; reject before
/// spending any network round trips.
const MIN_PRIVATE_KEY_LEN: usize = 100;

/// Default number of trailing days a full fetch requests.
pub const DEFAULT_FETCH_DAYS: u32 = 60;

type SharedFetch = Shared<BoxFuture<'static, Result<SalesDataset, CoreError>>>;
type SharedCheck = Shared<BoxFuture<'static, Result<(), CoreError>>>;

enum DataMemo {
    InProgress(SharedFetch),
    Loaded { data: SalesDataset, at: Instant },
}

enum CheckMemo {
    InProgress(SharedCheck),
    Loaded {
        result: Result<(), CoreError>,
        at: Instant,
    },
}

/// Per-account request coordination: memoizes completed fetches and
/// coalesces concurrent callers onto one in-flight fetch, so N
/// same-account requests within the freshness window cost exactly one
/// underlying network fetch.
///
/// Constructed once per process and injected; `reset_memoization`
/// exists for tests and explicit cache invalidation.
pub struct RequestCoordinator {
    reports: Arc<ReportService>,
    cache: Arc<DataCache>,
    converter: Arc<CurrencyConverter>,
    data_memo: Mutex<HashMap<String, DataMemo>>,
    check_memo: Mutex<HashMap<String, CheckMemo>>,
}

enum DataPlan {
    Hit(SalesDataset),
    Join(SharedFetch),
    Own(SharedFetch),
}

enum CheckPlan {
    Hit(Result<(), CoreError>),
    Join(SharedCheck),
    Own(SharedCheck),
}

impl RequestCoordinator {
    pub fn new(
        reports: Arc<ReportService>,
        cache: Arc<DataCache>,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        Self {
            reports,
            cache,
            converter,
            data_memo: Mutex::new(HashMap::new()),
            check_memo: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch an account's dataset, expressed in `currency`.
    ///
    /// With `use_memoization`, a loaded result younger than five
    /// minutes is served directly and an in-flight fetch is joined
    /// instead of duplicated. Without it, the lookup is bypassed but
    /// the result is still published so concurrent sharers benefit.
    /// With `use_cache`, previously cached days seed the dataset and
    /// only missing days are fetched.
    pub async fn get_data(
        &self,
        account: &Account,
        currency: &str,
        num_days: u32,
        use_cache: bool,
        use_memoization: bool,
    ) -> Result<SalesDataset, CoreError> {
        let currency = currency.to_uppercase();

        let plan = {
            let mut memo = lock_recover(&self.data_memo);

            let hit = if use_memoization {
                match memo.get(account.id()) {
                    Some(DataMemo::Loaded { data, at }) if at.elapsed() < DATA_MEMO_TTL => {
                        Some(DataPlan::Hit(data.clone()))
                    }
                    Some(DataMemo::Loaded { .. }) => {
                        memo.remove(account.id());
                        None
                    }
                    Some(DataMemo::InProgress(shared)) => Some(DataPlan::Join(shared.clone())),
                    None => None,
                }
            } else {
                None
            };

            match hit {
                Some(plan) => plan,
                None => {
                    let shared =
                        self.spawn_fetch(account.clone(), currency.clone(), num_days, use_cache);
                    memo.insert(
                        account.id().to_string(),
                        DataMemo::InProgress(shared.clone()),
                    );
                    DataPlan::Own(shared)
                }
            }
        };

        match plan {
            DataPlan::Hit(data) => Ok(data.change_currency(&self.converter, &currency)),
            DataPlan::Join(shared) => {
                let data = shared.await?;
                Ok(data.change_currency(&self.converter, &currency))
            }
            DataPlan::Own(shared) => {
                let result = shared.clone().await;

                let mut memo = lock_recover(&self.data_memo);
                // Only touch the table if our fetch is still the one
                // registered — a later forced refresh may have
                // replaced it while we awaited.
                let ours = matches!(
                    memo.get(account.id()),
                    Some(DataMemo::InProgress(current)) if current.ptr_eq(&shared)
                );
                if ours {
                    match &result {
                        Ok(data) => {
                            memo.insert(
                                account.id().to_string(),
                                DataMemo::Loaded {
                                    data: data.clone(),
                                    at: Instant::now(),
                                },
                            );
                        }
                        Err(_) => {
                            memo.remove(account.id());
                        }
                    }
                }

                result
            }
        }
    }

    /// Cheap credential-validity probe: fetches a single day of data
    /// without touching the cache. A provider answer of "no report
    /// yet" counts as valid credentials. Outcomes (including failures)
    /// are memoized for thirty seconds.
    pub async fn check_credentials(&self, account: &Account) -> Result<(), CoreError> {
        let plan = {
            let mut memo = lock_recover(&self.check_memo);

            let hit = match memo.get(account.id()) {
                Some(CheckMemo::Loaded { result, at }) if at.elapsed() < CHECK_MEMO_TTL => {
                    Some(CheckPlan::Hit(result.clone()))
                }
                Some(CheckMemo::Loaded { .. }) => {
                    memo.remove(account.id());
                    None
                }
                Some(CheckMemo::InProgress(shared)) => Some(CheckPlan::Join(shared.clone())),
                None => None,
            };

            match hit {
                Some(plan) => plan,
                None => {
                    let shared = self.spawn_check(account.clone());
                    memo.insert(
                        account.id().to_string(),
                        CheckMemo::InProgress(shared.clone()),
                    );
                    CheckPlan::Own(shared)
                }
            }
        };

        match plan {
            CheckPlan::Hit(result) => result,
            CheckPlan::Join(shared) => shared.await,
            CheckPlan::Own(shared) => {
                let result = shared.clone().await;

                let mut memo = lock_recover(&self.check_memo);
                let ours = matches!(
                    memo.get(account.id()),
                    Some(CheckMemo::InProgress(current)) if current.ptr_eq(&shared)
                );
                if ours {
                    memo.insert(
                        account.id().to_string(),
                        CheckMemo::Loaded {
                            result: result.clone(),
                            at: Instant::now(),
                        },
                    );
                }

                result
            }
        }
    }

    /// Drop both memoization tables. Exposed for tests and for
    /// explicit "refresh everything" actions.
    pub fn reset_memoization(&self) {
        lock_recover(&self.data_memo).clear();
        lock_recover(&self.check_memo).clear();
    }

    fn spawn_fetch(
        &self,
        account: Account,
        currency: String,
        num_days: u32,
        use_cache: bool,
    ) -> SharedFetch {
        let reports = Arc::clone(&self.reports);
        let cache = Arc::clone(&self.cache);
        let converter = Arc::clone(&self.converter);

        let handle = tokio::spawn(async move {
            fetch_from_api(reports, cache, converter, account, currency, num_days, use_cache).await
        });

        async move {
            handle
                .await
                .map_err(|e| CoreError::Unknown(format!("fetch task failed: {e}")))?
        }
        .boxed()
        .shared()
    }

    fn spawn_check(&self, account: Account) -> SharedCheck {
        let reports = Arc::clone(&self.reports);
        let cache = Arc::clone(&self.cache);
        let converter = Arc::clone(&self.converter);

        let handle = tokio::spawn(async move {
            match fetch_from_api(reports, cache, converter, account, "USD".into(), 1, false).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_no_data() => Ok(()),
                Err(e) => Err(e),
            }
        });

        async move {
            handle
                .await
                .map_err(|e| CoreError::Unknown(format!("check task failed: {e}")))?
        }
        .boxed()
        .shared()
    }
}

fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The full fetch cycle: validate credentials, refresh rates, seed
/// from the cache, fetch missing days, resolve app metadata, persist
/// the merged dataset.
async fn fetch_from_api(
    reports: Arc<ReportService>,
    cache: Arc<DataCache>,
    converter: Arc<CurrencyConverter>,
    account: Account,
    currency: String,
    num_days: u32,
    use_cache: bool,
) -> Result<SalesDataset, CoreError> {
    if account.private_key.len() < MIN_PRIVATE_KEY_LEN {
        return Err(CoreError::InvalidCredentials);
    }

    // Rate refresh is best-effort: without rates, conversions resolve
    // to 0 instead of blocking ingestion.
    if let Err(e) = converter.refresh().await {
        log::warn!("exchange-rate refresh failed: {e}");
    }

    // Reports lag a day; request the last `num_days` ending yesterday.
    let today = Utc::now().date_naive();
    let end = today.pred_opt().unwrap_or(today);
    let requested: Vec<NaiveDate> = (0..u64::from(num_days))
        .filter_map(|i| end.checked_sub_days(Days::new(i)))
        .collect();

    let mut events = Vec::new();
    if use_cache {
        if let Some(cached) = cache.get(&account) {
            events.extend(cached.change_currency(&converter, &currency).events);
        }
    }

    let have: HashSet<NaiveDate> = events.iter().map(|e| e.date).collect();
    let missing: Vec<NaiveDate> = requested
        .into_iter()
        .filter(|d| !have.contains(d))
        .collect();

    log::debug!(
        "fetching {} missing day(s) for account {}",
        missing.len(),
        account.id()
    );

    let fetched = reports
        .fetch_missing(&account, &missing, &converter, &currency)
        .await?;
    events.extend(fetched);

    let apps = reports.resolve_apps(&events).await;
    let dataset = SalesDataset::new(events, apps, currency);

    cache.put(&dataset, &account, &converter);

    Ok(dataset)
}
