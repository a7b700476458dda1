//! Action registry.
//!
//! # Design
//! Every callable action is declared up front as a [`Handler`]: a direct
//! endpoint, a group whose concrete endpoint is picked by the `action`
//! parameter, or the multipart upload endpoint. The table is validated once
//! when the client is built and is read-only afterwards. Anything not in the
//! table is rejected without I/O.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::encoding::Encoding;
use crate::error::ConfigError;
use crate::http::HttpMethod;
use crate::normalize::{FailureLayer, NormalizedResult, Rule};

pub const TAPPAY_ACTION: &str = "tappayAction";
pub const ATM_ACTION: &str = "atmAction";
pub const MERCHANT_CREATE: &str = "merchantCreate";
pub const MERCHANT_UPDATE: &str = "merchantUpdate";
pub const MERCHANT_QUERY: &str = "merchantQuery";
pub const PLATFORM_BIND_CARD: &str = "platformBindCard";
pub const PLATFORM_PAY_BY_PRIME: &str = "platformPayByPrime";
pub const PLATFORM_PAY_BY_TOKEN: &str = "platformPayByToken";
pub const CURRENCY_EXCHANGE: &str = "currencyExchange";
pub const CREATE_ORDER: &str = "createOrder";
pub const CREATE_REDIRECT_PAYMENT: &str = "createRedirectPayment";
pub const UPLOAD_QUALIFICATION: &str = "uploadQualification";

/// Parameter that selects the member of a dispatch group.
pub const GROUP_SELECTOR: &str = "action";

/// Card-gateway operations reached through `tappayAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayAction {
    PayByPrime,
    PayByToken,
    Bind,
    Remove,
    Query,
    History,
    Refund,
}

impl GatewayAction {
    pub const ALL: [GatewayAction; 7] = [
        GatewayAction::PayByPrime,
        GatewayAction::PayByToken,
        GatewayAction::Bind,
        GatewayAction::Remove,
        GatewayAction::Query,
        GatewayAction::History,
        GatewayAction::Refund,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayAction::PayByPrime => "pay-by-prime",
            GatewayAction::PayByToken => "pay-by-token",
            GatewayAction::Bind => "bind",
            GatewayAction::Remove => "remove",
            GatewayAction::Query => "query",
            GatewayAction::History => "history",
            GatewayAction::Refund => "refund",
        }
    }

    /// The transaction query reports a found record as status 2; every other
    /// gateway operation reports success as 0.
    pub fn rule(self) -> Rule {
        match self {
            GatewayAction::Query => Rule::StatusTwo,
            _ => Rule::StatusZero,
        }
    }
}

/// ATM virtual-account operations reached through `atmAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtmAction {
    PayByPrime,
    Record,
    TradeHistory,
    Reconciliation,
    SimulatePaid,
}

impl AtmAction {
    pub const ALL: [AtmAction; 5] = [
        AtmAction::PayByPrime,
        AtmAction::Record,
        AtmAction::TradeHistory,
        AtmAction::Reconciliation,
        AtmAction::SimulatePaid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AtmAction::PayByPrime => "pay-by-prime",
            AtmAction::Record => "record",
            AtmAction::TradeHistory => "trade-history",
            AtmAction::Reconciliation => "reconciliation",
            AtmAction::SimulatePaid => "simulate-paid",
        }
    }
}

/// One remote endpoint: where it lives, how its body is encoded and how its
/// answer is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub encoding: Encoding,
    pub rule: Rule,
}

impl ActionDescriptor {
    pub fn new(name: &str, method: HttpMethod, path: &str, encoding: Encoding, rule: Rule) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
            encoding,
            rule,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDescriptor {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("empty name"));
        }
        if !self.path.starts_with('/') || self.path.contains("..") {
            return Err(invalid("path must be absolute and must not contain `..`"));
        }
        match (self.method, self.encoding) {
            (HttpMethod::Get, Encoding::Query) => Ok(()),
            (HttpMethod::Get, _) => Err(invalid("GET actions must use query encoding")),
            (HttpMethod::Post, Encoding::Query) => Err(invalid("query encoding requires GET")),
            (HttpMethod::Post, _) => Ok(()),
        }
    }
}

/// Several endpoints behind one action name, selected by `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGroup {
    name: String,
    members: BTreeMap<String, ActionDescriptor>,
}

impl ActionGroup {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: BTreeMap::new(),
        }
    }

    /// Add a member served at `path` and read with `rule`.
    pub fn member(mut self, kind: &str, path: &str, rule: Rule) -> Self {
        let descriptor = ActionDescriptor::new(
            &format!("{}.{kind}", self.name),
            HttpMethod::Post,
            path,
            Encoding::Json,
            rule,
        );
        self.members.insert(kind.to_string(), descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, kind: &str) -> Option<&ActionDescriptor> {
        self.members.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// The closed set of things an action name can resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    Direct(ActionDescriptor),
    Group(ActionGroup),
    Upload(ActionDescriptor),
}

impl Handler {
    fn name(&self) -> &str {
        match self {
            Handler::Direct(d) | Handler::Upload(d) => &d.name,
            Handler::Group(g) => &g.name,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Handler::Direct(d) => {
                d.validate()?;
                if d.encoding == Encoding::Multipart {
                    return Err(ConfigError::InvalidDescriptor {
                        name: d.name.clone(),
                        reason: "multipart endpoints must be registered as uploads".to_string(),
                    });
                }
                Ok(())
            }
            Handler::Upload(d) => {
                d.validate()?;
                if d.encoding != Encoding::Multipart || d.rule != Rule::HttpOkPassthrough {
                    return Err(ConfigError::InvalidDescriptor {
                        name: d.name.clone(),
                        reason: "uploads use multipart encoding and the HTTP 200 pass-through rule".to_string(),
                    });
                }
                Ok(())
            }
            Handler::Group(g) => {
                if g.members.is_empty() {
                    return Err(ConfigError::InvalidDescriptor {
                        name: g.name.clone(),
                        reason: "group has no members".to_string(),
                    });
                }
                g.members.values().try_for_each(ActionDescriptor::validate)
            }
        }
    }
}

/// What an action name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Send(&'a ActionDescriptor),
    Upload(&'a ActionDescriptor),
    Reject(NormalizedResult),
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    handlers: Vec<Handler>,
}

impl RegistryBuilder {
    pub fn direct(mut self, name: &str, method: HttpMethod, path: &str, encoding: Encoding, rule: Rule) -> Self {
        self.handlers
            .push(Handler::Direct(ActionDescriptor::new(name, method, path, encoding, rule)));
        self
    }

    pub fn group(mut self, group: ActionGroup) -> Self {
        self.handlers.push(Handler::Group(group));
        self
    }

    pub fn upload(mut self, name: &str, path: &str) -> Self {
        self.handlers.push(Handler::Upload(ActionDescriptor::new(
            name,
            HttpMethod::Post,
            path,
            Encoding::Multipart,
            Rule::HttpOkPassthrough,
        )));
        self
    }

    pub fn build(self) -> Result<Registry, ConfigError> {
        let mut routes = BTreeMap::new();
        for handler in self.handlers {
            handler.validate()?;
            let name = handler.name().to_string();
            if routes.insert(name.clone(), handler).is_some() {
                return Err(ConfigError::DuplicateAction(name));
            }
        }
        Ok(Registry { routes })
    }
}

/// Read-only table of every callable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    routes: BTreeMap<String, Handler>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The gateway's published endpoint table.
    pub fn standard() -> Result<Self, ConfigError> {
        let tappay = GatewayAction::ALL.iter().fold(ActionGroup::new(TAPPAY_ACTION), |group, action| {
            group.member(action.as_str(), &format!("/tappay/{}", action.as_str()), action.rule())
        });
        let atm = AtmAction::ALL.iter().fold(ActionGroup::new(ATM_ACTION), |group, action| {
            group.member(action.as_str(), &format!("/atm/{}", action.as_str()), Rule::StatusZeroOrTwo)
        });

        Self::builder()
            .group(tappay)
            .group(atm)
            .direct(MERCHANT_CREATE, HttpMethod::Post, "/merchant/create", Encoding::Form, Rule::StatusZero)
            .direct(MERCHANT_UPDATE, HttpMethod::Post, "/merchant/update", Encoding::Form, Rule::StatusZero)
            .direct(MERCHANT_QUERY, HttpMethod::Get, "/merchant/query", Encoding::Query, Rule::StatusZero)
            .direct(PLATFORM_BIND_CARD, HttpMethod::Post, "/platform/card/bind", Encoding::Json, Rule::StatusZero)
            .direct(PLATFORM_PAY_BY_PRIME, HttpMethod::Post, "/platform/pay-by-prime", Encoding::Json, Rule::StatusZero)
            .direct(PLATFORM_PAY_BY_TOKEN, HttpMethod::Post, "/platform/pay-by-token", Encoding::Json, Rule::StatusZero)
            .direct(CURRENCY_EXCHANGE, HttpMethod::Get, "/currency/exchange", Encoding::Query, Rule::HttpOkPassthrough)
            .direct(CREATE_ORDER, HttpMethod::Post, "/order/create", Encoding::Json, Rule::OkFlag)
            .direct(
                CREATE_REDIRECT_PAYMENT,
                HttpMethod::Post,
                "/third-party/redirect-payment",
                Encoding::Form,
                Rule::SuccessFlag,
            )
            .upload(UPLOAD_QUALIFICATION, "/qualification/upload")
            .build()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.routes.get(name)
    }

    /// The first registered upload endpoint.
    pub fn upload_descriptor(&self) -> Option<&ActionDescriptor> {
        self.routes.values().find_map(|handler| match handler {
            Handler::Upload(d) => Some(d),
            _ => None,
        })
    }

    /// Resolve `name` against the table. For groups the `action` parameter
    /// is checked here, before anything is sent, and removed from `params`.
    pub fn resolve<'a>(&'a self, name: &str, params: &mut Map<String, Value>) -> Resolution<'a> {
        match self.routes.get(name) {
            None => Resolution::Reject(NormalizedResult::unsupported_method(name)),
            Some(Handler::Direct(descriptor)) => Resolution::Send(descriptor),
            Some(Handler::Upload(descriptor)) => Resolution::Upload(descriptor),
            Some(Handler::Group(group)) => match params.remove(GROUP_SELECTOR) {
                Some(Value::String(kind)) => match group.get(&kind) {
                    Some(descriptor) => Resolution::Send(descriptor),
                    None => Resolution::Reject(NormalizedResult::unsupported_action(&kind)),
                },
                Some(other) => Resolution::Reject(NormalizedResult::unsupported_action(&other.to_string())),
                None => Resolution::Reject(NormalizedResult::failure(
                    FailureLayer::InvalidRequest,
                    format!("Missing action parameter for {}", group.name),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn standard_registry_builds() {
        let registry = Registry::standard().unwrap();
        assert_eq!(registry.names().count(), 12);
        assert_eq!(registry.upload_descriptor().unwrap().path, "/qualification/upload");
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = Registry::standard().unwrap();
        let resolution = registry.resolve("dropDatabase", &mut Map::new());
        assert_eq!(
            resolution,
            Resolution::Reject(NormalizedResult::unsupported_method("dropDatabase"))
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = Registry::standard().unwrap();
        assert!(matches!(registry.resolve("CreateOrder", &mut Map::new()), Resolution::Reject(_)));
    }

    #[test]
    fn group_member_is_selected_and_selector_consumed() {
        let registry = Registry::standard().unwrap();
        let mut p = params(json!({"action": "query", "rec_trade_id": "D1"}));
        match registry.resolve(TAPPAY_ACTION, &mut p) {
            Resolution::Send(d) => {
                assert_eq!(d.path, "/tappay/query");
                assert_eq!(d.rule, Rule::StatusTwo);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!p.contains_key("action"));
    }

    #[test]
    fn group_with_unknown_member_names_it() {
        let registry = Registry::standard().unwrap();
        let mut p = params(json!({"action": "explode"}));
        match registry.resolve(TAPPAY_ACTION, &mut p) {
            Resolution::Reject(result) => assert_eq!(result.message(), Some("Unsupported action: explode")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn group_without_selector_is_invalid_request() {
        let registry = Registry::standard().unwrap();
        match registry.resolve(ATM_ACTION, &mut Map::new()) {
            Resolution::Reject(result) => {
                assert_eq!(result.failure_layer(), Some(FailureLayer::InvalidRequest));
                assert_eq!(result.message(), Some("Missing action parameter for atmAction"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn atm_members_accept_zero_or_two() {
        let registry = Registry::standard().unwrap();
        for action in AtmAction::ALL {
            let mut p = params(json!({"action": action.as_str()}));
            match registry.resolve(ATM_ACTION, &mut p) {
                Resolution::Send(d) => assert_eq!(d.rule, Rule::StatusZeroOrTwo),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn duplicate_names_fail_fast() {
        let err = Registry::builder()
            .direct("a", HttpMethod::Post, "/a", Encoding::Json, Rule::OkFlag)
            .direct("a", HttpMethod::Post, "/b", Encoding::Json, Rule::OkFlag)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAction(name) if name == "a"));
    }

    #[test]
    fn query_on_post_is_misconfigured() {
        let err = Registry::builder()
            .direct("a", HttpMethod::Post, "/a", Encoding::Query, Rule::OkFlag)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDescriptor { .. }));
    }

    #[test]
    fn direct_multipart_is_misconfigured() {
        let err = Registry::builder()
            .direct("a", HttpMethod::Post, "/a", Encoding::Multipart, Rule::HttpOkPassthrough)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDescriptor { .. }));
    }

    #[test]
    fn empty_group_is_misconfigured() {
        assert!(Registry::builder().group(ActionGroup::new("g")).build().is_err());
    }

    #[test]
    fn relative_path_is_misconfigured() {
        assert!(Registry::builder()
            .direct("a", HttpMethod::Post, "a", Encoding::Json, Rule::OkFlag)
            .build()
            .is_err());
    }
}
