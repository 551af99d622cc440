//! Metadata store and the frozen handler registry.
//!
//! # Responsibilities
//! - Collect handler records per module key during startup
//! - Merge annotation fragments into handler configs
//! - Keep the per-module verb map
//! - Freeze into an immutable registry for request-time lookup
//!
//! # Design Decisions
//! - Mutable only before `freeze()`; the frozen registry is shared via `Arc`
//! - Undeclared handler parameters become required at freeze time
//! - Verb names are case-insensitive

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::error::ApiError;
use crate::dispatch::handler::Handler;
use crate::registry::config::HandlerConfig;
use crate::registry::requirement::ParameterRequirement;
use crate::routing::table::{Route, RouteTable};

/// Address of one handler: module key plus member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey {
    pub module: String,
    pub member: String,
}

impl HandlerKey {
    pub fn new(module: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            member: member.into(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.member)
    }
}

#[derive(Default)]
struct MemberRecord {
    config: HandlerConfig,
    param_names: Vec<String>,
    handler: Option<Arc<dyn Handler>>,
}

#[derive(Default)]
struct ModuleRecord {
    verbs: BTreeMap<String, String>,
    members: BTreeMap<String, MemberRecord>,
}

/// Incremental store of handler metadata, used while loading.
#[derive(Default)]
pub struct MetadataStore {
    modules: BTreeMap<String, ModuleRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn member_mut(&mut self, key: &HandlerKey) -> &mut MemberRecord {
        self.modules
            .entry(key.module.clone())
            .or_default()
            .members
            .entry(key.member.clone())
            .or_default()
    }

    /// Merge a config fragment into a handler's record.
    pub fn attach(&mut self, key: &HandlerKey, fragment: HandlerConfig) {
        self.member_mut(key).config.merge(fragment);
    }

    /// The merged config for a handler, if anything was attached.
    pub fn read(&self, key: &HandlerKey) -> Option<&HandlerConfig> {
        self.modules
            .get(&key.module)?
            .members
            .get(&key.member)
            .map(|m| &m.config)
    }

    /// Serve `method` on `module` with member `member`.
    pub fn map_verb(&mut self, module: &str, method: &str, member: &str) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .verbs
            .insert(method.to_ascii_uppercase(), member.to_string());
    }

    /// The member serving `method` on `module`.
    pub fn verb(&self, module: &str, method: &str) -> Option<&str> {
        self.modules
            .get(module)?
            .verbs
            .get(&method.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Register a handler function with its ordered parameter names.
    pub fn register<H: Handler>(&mut self, key: &HandlerKey, param_names: &[&str], handler: H) {
        self.register_arc(key, param_names, Arc::new(handler));
    }

    pub fn register_arc(&mut self, key: &HandlerKey, param_names: &[&str], handler: Arc<dyn Handler>) {
        let record = self.member_mut(key);
        if record.handler.is_some() {
            tracing::warn!(handler = %key, "Handler registered twice, replacing");
        }
        record.param_names = param_names.iter().map(|s| s.to_string()).collect();
        record.handler = Some(handler);
    }

    /// Start a fluent registration for one module.
    pub fn module(&mut self, module_key: &str) -> ModuleBuilder<'_> {
        self.modules.entry(module_key.to_string()).or_default();
        ModuleBuilder {
            store: self,
            module: module_key.to_string(),
        }
    }

    /// Freeze into the immutable request-time registry.
    pub fn freeze(self) -> HandlerRegistry {
        let mut modules = HashMap::with_capacity(self.modules.len());

        for (module_key, module) in self.modules {
            let mut members: BTreeMap<String, Arc<ResolvedHandler>> = BTreeMap::new();

            for (member, record) in module.members {
                let key = HandlerKey::new(module_key.clone(), member.clone());
                let Some(handler) = record.handler else {
                    tracing::warn!(handler = %key, "Metadata attached to a member with no handler");
                    continue;
                };
                members.insert(
                    member,
                    Arc::new(ResolvedHandler::new(key, record.config, record.param_names, handler)),
                );
            }

            let mut verbs = HashMap::with_capacity(module.verbs.len());
            for (verb, member) in module.verbs {
                match members.get(&member) {
                    Some(resolved) => {
                        verbs.insert(verb, resolved.clone());
                    }
                    None => {
                        tracing::warn!(module = %module_key, verb = %verb, member = %member, "Verb mapped to an unregistered member");
                    }
                }
            }

            modules.insert(module_key, FrozenModule { verbs });
        }

        HandlerRegistry { modules }
    }
}

/// Fluent registration for one module.
pub struct ModuleBuilder<'s> {
    store: &'s mut MetadataStore,
    module: String,
}

impl<'s> ModuleBuilder<'s> {
    /// Register `member` and map it to `method`.
    pub fn route<H: Handler>(
        self,
        method: Method,
        member: &str,
        param_names: &[&str],
        handler: H,
    ) -> HandlerBuilder<'s> {
        let key = HandlerKey::new(self.module.clone(), member);
        self.store.register(&key, param_names, handler);
        self.store.map_verb(&self.module, method.as_str(), member);
        HandlerBuilder { store: self.store, key }
    }

    pub fn get<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::GET, member, param_names, handler)
    }

    pub fn post<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::POST, member, param_names, handler)
    }

    pub fn put<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::PUT, member, param_names, handler)
    }

    pub fn patch<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::PATCH, member, param_names, handler)
    }

    pub fn delete<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::DELETE, member, param_names, handler)
    }

    pub fn options<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::OPTIONS, member, param_names, handler)
    }

    pub fn head<H: Handler>(self, member: &str, param_names: &[&str], handler: H) -> HandlerBuilder<'s> {
        self.route(Method::HEAD, member, param_names, handler)
    }
}

/// Attaches fragments to a just-registered handler.
pub struct HandlerBuilder<'s> {
    store: &'s mut MetadataStore,
    key: HandlerKey,
}

impl HandlerBuilder<'_> {
    pub fn with(self, fragment: HandlerConfig) -> Self {
        self.store.attach(&self.key, fragment);
        self
    }

    /// Also serve this member for another verb.
    pub fn also(self, method: Method) -> Self {
        self.store
            .map_verb(&self.key.module, method.as_str(), &self.key.member);
        self
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }
}

/// A handler ready for dispatch.
pub struct ResolvedHandler {
    pub key: HandlerKey,
    pub config: HandlerConfig,
    /// Positional parameter names for invocation.
    pub param_names: Vec<String>,
    /// Every parameter to resolve: declared ones first, then extra
    /// configured ones by name.
    pub requirements: Vec<(String, ParameterRequirement)>,
    pub handler: Arc<dyn Handler>,
}

impl ResolvedHandler {
    fn new(
        key: HandlerKey,
        mut config: HandlerConfig,
        param_names: Vec<String>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        for name in &param_names {
            config
                .params
                .entry(name.clone())
                .or_insert_with(|| ParameterRequirement::required(true));
        }

        let mut requirements: Vec<(String, ParameterRequirement)> = param_names
            .iter()
            .filter_map(|name| config.params.get(name).map(|r| (name.clone(), r.clone())))
            .collect();
        requirements.extend(
            config
                .params
                .iter()
                .filter(|(name, _)| !param_names.contains(*name))
                .map(|(name, r)| (name.clone(), r.clone())),
        );

        Self {
            key,
            config,
            param_names,
            requirements,
            handler,
        }
    }
}

impl fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("key", &self.key)
            .field("config", &self.config)
            .field("param_names", &self.param_names)
            .finish()
    }
}

struct FrozenModule {
    verbs: HashMap<String, Arc<ResolvedHandler>>,
}

/// Immutable registry consulted per request.
#[derive(Default)]
pub struct HandlerRegistry {
    modules: HashMap<String, FrozenModule>,
}

impl HandlerRegistry {
    /// Find the handler for `method` on `module_key`.
    ///
    /// Unknown modules, unmapped verbs and verbs without a handler are all
    /// `NotFound`. Verbs compare case-insensitively, extension methods
    /// included.
    pub fn resolve(&self, module_key: &str, method: &Method) -> Result<Arc<ResolvedHandler>, ApiError> {
        self.modules
            .get(module_key)
            .and_then(|m| m.verbs.get(&method.as_str().to_ascii_uppercase()))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    pub fn contains_module(&self, module_key: &str) -> bool {
        self.modules.contains_key(module_key)
    }

    /// Verbs served by a module, sorted.
    pub fn verbs(&self, module_key: &str) -> Vec<&str> {
        let mut verbs: Vec<&str> = self
            .modules
            .get(module_key)
            .map(|m| m.verbs.keys().map(String::as_str).collect())
            .unwrap_or_default();
        verbs.sort_unstable();
        verbs
    }

    /// Routes whose module has no registered handlers.
    pub fn unregistered<'t>(&self, table: &'t RouteTable) -> Vec<&'t Route> {
        table
            .iter()
            .filter(|route| !self.contains_module(&route.module_key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        modules.sort_unstable();
        f.debug_struct("HandlerRegistry").field("modules", &modules).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::error::ApiError;
    use crate::dispatch::handler::{sync_handler, Args};
    use crate::registry::annotate;
    use crate::registry::requirement::SourcePath;

    fn noop() -> impl Handler {
        sync_handler(|_args: Args| Ok::<_, ApiError>(()))
    }

    #[test]
    fn test_attach_and_read() {
        let mut store = MetadataStore::new();
        let key = HandlerKey::new("users/[id]", "get_user");
        assert!(store.read(&key).is_none());

        store.attach(&key, annotate::required("x"));
        store.attach(&key, annotate::query("x"));

        let config = store.read(&key).unwrap();
        assert_eq!(config.params["x"].required, Some(true));
        assert_eq!(config.params["x"].sources, vec![SourcePath::parse("query.x")]);
    }

    #[test]
    fn test_verbs_are_case_insensitive() {
        let mut store = MetadataStore::new();
        store.map_verb("users", "get", "list");
        assert_eq!(store.verb("users", "GET"), Some("list"));
        assert_eq!(store.verb("users", "Get"), Some("list"));
        assert_eq!(store.verb("users", "POST"), None);
    }

    #[test]
    fn test_freeze_and_resolve() {
        let mut store = MetadataStore::new();
        store
            .module("users/[id]")
            .get("get_user", &["id", "verbose"], noop())
            .with(annotate::path("id"))
            .with(annotate::optional("verbose"))
            .also(Method::HEAD);

        let registry = store.freeze();
        let resolved = registry.resolve("users/[id]", &Method::GET).unwrap();
        assert_eq!(resolved.key, HandlerKey::new("users/[id]", "get_user"));
        assert_eq!(resolved.param_names, vec!["id", "verbose"]);
        assert!(registry.resolve("users/[id]", &Method::HEAD).is_ok());
        assert_eq!(registry.verbs("users/[id]"), vec!["GET", "HEAD"]);

        assert!(matches!(
            registry.resolve("users/[id]", &Method::POST),
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            registry.resolve("missing", &Method::GET),
            Err(ApiError::NotFound)
        ));
    }

    #[test]
    fn test_extension_methods_resolve_in_any_case() {
        let mut store = MetadataStore::new();
        store.register(&HandlerKey::new("cache", "purge"), &[], noop());
        store.map_verb("cache", "purge", "purge");

        let registry = store.freeze();
        let lower = Method::from_bytes(b"purge").unwrap();
        let upper = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(registry.resolve("cache", &lower).unwrap().key.member, "purge");
        assert!(registry.resolve("cache", &upper).is_ok());
        assert_eq!(registry.verbs("cache"), vec!["PURGE"]);
    }

    #[test]
    fn test_undeclared_params_default_to_required() {
        let mut store = MetadataStore::new();
        store
            .module("search")
            .get("search", &["q"], noop())
            .with(annotate::optional("debug"));

        let registry = store.freeze();
        let resolved = registry.resolve("search", &Method::GET).unwrap();
        assert_eq!(resolved.config.params["q"].required, Some(true));

        let names: Vec<&str> = resolved.requirements.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["q", "debug"]);
    }

    #[test]
    fn test_verb_without_handler_is_dropped() {
        let mut store = MetadataStore::new();
        store.map_verb("ghost", "GET", "nothing");
        store.attach(&HandlerKey::new("ghost", "nothing"), annotate::required("x"));

        let registry = store.freeze();
        assert!(registry.contains_module("ghost"));
        assert!(registry.resolve("ghost", &Method::GET).is_err());
    }

    #[test]
    fn test_unregistered_routes() {
        use crate::routing::grammar::RoutePattern;
        use std::path::PathBuf;

        let mut store = MetadataStore::new();
        store.module("users").get("list", &[], noop());
        let registry = store.freeze();

        let table = RouteTable::from_routes(vec![
            Route::new(RoutePattern::parse("/users"), PathBuf::from("users.rs"), "users"),
            Route::new(RoutePattern::parse("/orders"), PathBuf::from("orders.rs"), "orders"),
        ]);
        let missing: Vec<&str> = registry
            .unregistered(&table)
            .iter()
            .map(|r| r.module_key.as_str())
            .collect();
        assert_eq!(missing, vec!["orders"]);
    }
}
