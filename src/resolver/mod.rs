//! External package resolution.
//!
//! Packages are resolved through an injectable [`PackageQuery`] and memoized
//! for the lifetime of a [`PackageResolver`], which is one generation run.
//! Each cache key owns a once-cell, so concurrent requests for the same
//! package wait on a single query instead of issuing their own. Failures are
//! cached the same way; a new run starts with an empty cache.

pub mod errors;
pub mod query;
pub mod version;

pub use errors::ResolutionError;
pub use query::{PackageQuery, PkgConfigQuery, QueryFailure, QueryOutput};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use rayon::prelude::*;

use crate::core::environment::Environment;
use crate::core::package::{Discovery, Package, PackageKind, PackageRequest};

type Resolution = Result<Arc<Package>, ResolutionError>;

/// Memoization key: what is asked for and the environment it is asked in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    kind: PackageKind,
    discovery: Discovery,
    environment: String,
}

/// Resolves package requests, at most one query per key.
pub struct PackageResolver {
    query: Arc<dyn PackageQuery>,
    cache: Mutex<HashMap<CacheKey, Arc<OnceLock<Resolution>>>>,
}

impl std::fmt::Debug for PackageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageResolver").finish_non_exhaustive()
    }
}

impl PackageResolver {
    pub fn new(query: Arc<dyn PackageQuery>) -> Self {
        PackageResolver {
            query,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one request.
    ///
    /// The version requirement is checked on every call, after the cache, so
    /// two requests that differ only in their requirement share one query.
    pub fn resolve(&self, request: &PackageRequest, env: &Environment) -> Result<Arc<Package>, ResolutionError> {
        let key = CacheKey {
            name: request.name.clone(),
            kind: request.kind,
            discovery: request.discovery.clone(),
            environment: env.key(),
        };

        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(cache.entry(key).or_default())
        };

        let package = cell.get_or_init(|| self.resolve_uncached(request)).clone()?;

        if let Some(required) = &request.version {
            let found = package.version.as_deref().unwrap_or("unknown");
            if !version::satisfies(required, found) {
                return Err(ResolutionError::VersionMismatch {
                    package: request.name.clone(),
                    required: required.to_string(),
                    found: found.to_string(),
                });
            }
        }

        Ok(package)
    }

    /// Resolve many requests in parallel, filling the cache.
    ///
    /// Errors are not reported here; the later in-order `resolve` calls
    /// return them from the cache.
    pub fn prefetch(&self, requests: &[PackageRequest], env: &Environment) {
        requests.par_iter().for_each(|request| {
            let _ = self.resolve(request, env);
        });
    }

    /// Number of distinct keys seen so far.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn resolve_uncached(&self, request: &PackageRequest) -> Resolution {
        let package = match &request.discovery {
            Discovery::Manual {
                include_dirs,
                lib_dirs,
                libs,
                version,
            } => Package::manual(&request.name, version.as_deref(), include_dirs, lib_dirs, libs)?,

            Discovery::Query => {
                let output = self
                    .query
                    .query(&request.name, request.kind)
                    .map_err(|failure| match failure {
                        QueryFailure::NotFound(detail) => ResolutionError::PackageNotFound {
                            package: request.name.clone(),
                            detail,
                        },
                        QueryFailure::Unavailable(message) | QueryFailure::Malformed(message) => {
                            ResolutionError::PackageQueryError {
                                package: request.name.clone(),
                                message,
                            }
                        }
                    })?;
                Package::from_words(&request.name, output.version, &output.cflags, &output.libs)?
            }
        };

        tracing::debug!(
            "resolved package `{}` ({} compile, {} link flags)",
            package.name,
            package.compile.len(),
            package.link.len()
        );
        Ok(Arc::new(package))
    }
}
