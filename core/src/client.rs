//! Action dispatcher and typed entry points.
//!
//! # Design
//! `PaygateClient` holds only read-only state: the validated configuration,
//! the action registry, a transport, an observer and a file source. A call is
//! split the same way everywhere: [`PaygateClient::prepare`] resolves the
//! action and builds an `HttpRequest` without I/O, the transport performs one
//! round-trip, and [`PreparedCall::parse`] normalizes the outcome. Hosts that
//! want to do the I/O themselves can stop after `prepare` and call `parse`
//! with their own `RawOutcome`.
//!
//! Every public call returns a `NormalizedResult`; nothing on the call path
//! returns an error or panics for an expected failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::encoding::{build_request, MultipartBody};
use crate::error::ConfigError;
use crate::http::{HttpRequest, RawOutcome};
use crate::normalize::{normalize_outcome, FailureLayer, NormalizedResult, Rule};
use crate::observe::{Observer, TracingObserver};
use crate::registry::{
    AtmAction, GatewayAction, Registry, Resolution, ATM_ACTION, CREATE_ORDER, CREATE_REDIRECT_PAYMENT,
    CURRENCY_EXCHANGE, GROUP_SELECTOR, MERCHANT_CREATE, MERCHANT_QUERY, MERCHANT_UPDATE, PLATFORM_BIND_CARD,
    PLATFORM_PAY_BY_PRIME, PLATFORM_PAY_BY_TOKEN, TAPPAY_ACTION, UPLOAD_QUALIFICATION,
};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AtmPayByPrime, BindCard, CreateOrder, CurrencyExchange, MerchantProfile, MerchantQuery, PayByPrime, PayByToken,
    PlatformBindCard, PlatformPayByPrime, PlatformPayByToken, Reconciliation, RedirectPayment, Refund, RemoveCard,
    SimulatePaid, TradeHistory, TradeQuery,
};
use crate::upload::{self, FileRef, FileSource, StorageFileSource, UploadSpec};

/// A request ready to send, paired with the rule that reads its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub action: String,
    pub request: HttpRequest,
    pub rule: Rule,
}

impl PreparedCall {
    pub fn parse(&self, outcome: &RawOutcome) -> NormalizedResult {
        normalize_outcome(self.rule, outcome)
    }
}

/// Client for the remote payment gateway.
pub struct PaygateClient<T = UreqTransport> {
    config: ClientConfig,
    registry: Registry,
    transport: T,
    observer: Arc<dyn Observer>,
    files: Arc<dyn FileSource>,
}

impl PaygateClient<UreqTransport> {
    /// Client over HTTP with the fixed request timeout.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> PaygateClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ConfigError> {
        Ok(Self {
            config,
            registry: Registry::standard()?,
            transport,
            observer: Arc::new(TracingObserver),
            files: Arc::new(StorageFileSource::new(".")),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Where upload file references are resolved. Defaults to paths relative
    /// to the working directory.
    pub fn with_file_source(mut self, files: Arc<dyn FileSource>) -> Self {
        self.files = files;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve `action` and build its request without performing I/O.
    pub fn prepare(&self, action: &str, mut params: Map<String, Value>) -> Result<PreparedCall, NormalizedResult> {
        let descriptor = match self.registry.resolve(action, &mut params) {
            Resolution::Send(descriptor) => descriptor,
            Resolution::Upload(descriptor) => {
                return Err(NormalizedResult::failure(
                    FailureLayer::InvalidRequest,
                    format!("{} carries files and must be sent with upload()", descriptor.name),
                ))
            }
            Resolution::Reject(result) => return Err(result),
        };

        let url = self.config.endpoint(&descriptor.path);
        let request = build_request(descriptor.method, url, descriptor.encoding, &params).map_err(|err| {
            NormalizedResult::failure(FailureLayer::InvalidRequest, format!("invalid request: {err}"))
        })?;
        Ok(PreparedCall {
            action: descriptor.name.clone(),
            request,
            rule: descriptor.rule,
        })
    }

    /// Perform `action` with `params` and normalize the gateway's answer.
    pub fn dispatch(&self, action: &str, params: Map<String, Value>) -> NormalizedResult {
        match self.prepare(action, params) {
            Ok(call) => self.execute(&call),
            Err(rejected) => {
                self.observer
                    .on_validation_failed(action, rejected.message().unwrap_or_default());
                rejected
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), taking any value that serializes to
    /// a JSON object.
    pub fn call<P: Serialize + ?Sized>(&self, action: &str, params: &P) -> NormalizedResult {
        match to_params(params) {
            Ok(map) => self.dispatch(action, map),
            Err(rejected) => {
                self.observer
                    .on_validation_failed(action, rejected.message().unwrap_or_default());
                rejected
            }
        }
    }

    fn call_member<P: Serialize + ?Sized>(&self, group: &str, kind: &str, params: &P) -> NormalizedResult {
        match to_params(params) {
            Ok(mut map) => {
                map.insert(GROUP_SELECTOR.to_string(), Value::String(kind.to_string()));
                self.dispatch(group, map)
            }
            Err(rejected) => {
                self.observer
                    .on_validation_failed(group, rejected.message().unwrap_or_default());
                rejected
            }
        }
    }

    fn execute(&self, call: &PreparedCall) -> NormalizedResult {
        self.observer.on_request_built(&call.action, &call.request);
        let outcome = self.transport.send(&call.request);
        match &outcome {
            RawOutcome::Response(response) => {
                self.observer
                    .on_response_received(&call.action, response.status, response.body.len())
            }
            RawOutcome::TransportFailure(cause) => self.observer.on_transport_failed(&call.action, cause),
        }
        call.parse(&outcome)
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    /// Upload qualification documents. Every file is resolved before anything
    /// is sent; one missing file fails the whole call with no request made.
    pub fn upload(&self, spec: &UploadSpec) -> NormalizedResult {
        let Some(descriptor) = self.registry.upload_descriptor() else {
            return NormalizedResult::unsupported_method(UPLOAD_QUALIFICATION);
        };
        let action = descriptor.name.as_str();

        if spec.files.is_empty() {
            let result = NormalizedResult::failure(FailureLayer::InvalidRequest, "no files to upload");
            self.observer.on_validation_failed(action, "no files to upload");
            return result;
        }

        let files = match upload::validate(spec, self.files.as_ref()) {
            Ok(files) => files,
            Err(err) => {
                let message = err.to_string();
                self.observer.on_validation_failed(action, &message);
                return NormalizedResult::failure(FailureLayer::Precondition, message);
            }
        };

        let body = upload::assemble(spec, files, MultipartBody::new());
        let call = PreparedCall {
            action: action.to_string(),
            request: body.into_request(self.config.endpoint(&descriptor.path)),
            rule: descriptor.rule,
        };
        self.execute(&call)
    }

    /// [`upload`](Self::upload) from its parts.
    pub fn upload_files(
        &self,
        files: BTreeMap<String, FileRef>,
        partner_account: &str,
        platform_key: &str,
    ) -> NormalizedResult {
        self.upload(&UploadSpec {
            files,
            partner_account: partner_account.to_string(),
            platform_key: platform_key.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Card gateway
    // -----------------------------------------------------------------------

    pub fn tappay<P: Serialize + ?Sized>(&self, action: GatewayAction, params: &P) -> NormalizedResult {
        self.call_member(TAPPAY_ACTION, action.as_str(), params)
    }

    pub fn pay_by_prime(&self, params: &PayByPrime) -> NormalizedResult {
        self.tappay(GatewayAction::PayByPrime, params)
    }

    pub fn pay_by_token(&self, params: &PayByToken) -> NormalizedResult {
        self.tappay(GatewayAction::PayByToken, params)
    }

    pub fn bind_card(&self, params: &BindCard) -> NormalizedResult {
        self.tappay(GatewayAction::Bind, params)
    }

    pub fn remove_card(&self, params: &RemoveCard) -> NormalizedResult {
        self.tappay(GatewayAction::Remove, params)
    }

    pub fn query_records(&self, params: &TradeQuery) -> NormalizedResult {
        self.tappay(GatewayAction::Query, params)
    }

    pub fn trade_history(&self, params: &TradeHistory) -> NormalizedResult {
        self.tappay(GatewayAction::History, params)
    }

    pub fn refund(&self, params: &Refund) -> NormalizedResult {
        self.tappay(GatewayAction::Refund, params)
    }

    // -----------------------------------------------------------------------
    // ATM
    // -----------------------------------------------------------------------

    pub fn atm<P: Serialize + ?Sized>(&self, action: AtmAction, params: &P) -> NormalizedResult {
        self.call_member(ATM_ACTION, action.as_str(), params)
    }

    pub fn atm_pay_by_prime(&self, params: &AtmPayByPrime) -> NormalizedResult {
        self.atm(AtmAction::PayByPrime, params)
    }

    pub fn atm_record(&self, params: &TradeQuery) -> NormalizedResult {
        self.atm(AtmAction::Record, params)
    }

    pub fn atm_trade_history(&self, params: &TradeHistory) -> NormalizedResult {
        self.atm(AtmAction::TradeHistory, params)
    }

    pub fn atm_reconciliation(&self, params: &Reconciliation) -> NormalizedResult {
        self.atm(AtmAction::Reconciliation, params)
    }

    pub fn atm_simulate_paid(&self, params: &SimulatePaid) -> NormalizedResult {
        self.atm(AtmAction::SimulatePaid, params)
    }

    // -----------------------------------------------------------------------
    // Merchant, platform, currency, orders
    // -----------------------------------------------------------------------

    pub fn merchant_create(&self, params: &MerchantProfile) -> NormalizedResult {
        self.call(MERCHANT_CREATE, params)
    }

    pub fn merchant_update(&self, params: &MerchantProfile) -> NormalizedResult {
        self.call(MERCHANT_UPDATE, params)
    }

    pub fn merchant_query(&self, params: &MerchantQuery) -> NormalizedResult {
        self.call(MERCHANT_QUERY, params)
    }

    pub fn platform_bind_card(&self, params: &PlatformBindCard) -> NormalizedResult {
        self.call(PLATFORM_BIND_CARD, params)
    }

    pub fn platform_pay_by_prime(&self, params: &PlatformPayByPrime) -> NormalizedResult {
        self.call(PLATFORM_PAY_BY_PRIME, params)
    }

    pub fn platform_pay_by_token(&self, params: &PlatformPayByToken) -> NormalizedResult {
        self.call(PLATFORM_PAY_BY_TOKEN, params)
    }

    pub fn currency_exchange(&self, params: &CurrencyExchange) -> NormalizedResult {
        self.call(CURRENCY_EXCHANGE, params)
    }

    pub fn create_order(&self, params: &CreateOrder) -> NormalizedResult {
        self.call(CREATE_ORDER, params)
    }

    pub fn create_redirect_payment(&self, params: &RedirectPayment) -> NormalizedResult {
        self.call(CREATE_REDIRECT_PAYMENT, params)
    }
}

fn to_params<P: Serialize + ?Sized>(params: &P) -> Result<Map<String, Value>, NormalizedResult> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(NormalizedResult::failure(
            FailureLayer::InvalidRequest,
            "invalid request: request parameters must be a JSON object",
        )),
        Err(err) => Err(NormalizedResult::failure(
            FailureLayer::InvalidRequest,
            format!("invalid request: {err}"),
        )),
    }
}
