//! Ref resolution: which commit each requested ref points to on the remote.

use std::collections::BTreeMap;

use strata_refs::validate_ref_name;
use strata_types::ObjectId;
use tracing::debug;

use crate::error::{PullError, PullResult};
use crate::options::PullOptions;
use crate::transport::RemoteTransport;

/// Resolve `requested` refs against the remote summary.
///
/// - Names are validated before the remote is contacted.
/// - An empty request resolves every advertised ref under `mirror`, and
///   resolves nothing (without contacting the remote) otherwise.
/// - A requested name the remote does not advertise fails with
///   [`PullError::RefNotFound`].
pub async fn resolve_refs(
    transport: &dyn RemoteTransport,
    remote: &str,
    requested: &[String],
    options: &PullOptions,
) -> PullResult<BTreeMap<String, ObjectId>> {
    for name in requested {
        validate_ref_name(name).map_err(|e| PullError::InvalidRequest(e.to_string()))?;
    }
    if requested.is_empty() && !options.mirror {
        return Ok(BTreeMap::new());
    }

    let summary = transport.fetch_summary().await?;
    debug!(remote, advertised = summary.len(), "fetched summary");

    if requested.is_empty() {
        for name in summary.refs.keys() {
            validate_ref_name(name).map_err(|e| {
                PullError::transport(transport.describe(), format!("remote advertised {e}"))
            })?;
        }
        return Ok(summary.refs);
    }

    let mut resolved = BTreeMap::new();
    for name in requested {
        let commit = summary.get(name).ok_or_else(|| PullError::RefNotFound {
            remote: remote.to_string(),
            name: name.clone(),
        })?;
        resolved.insert(name.clone(), commit);
    }
    Ok(resolved)
}
