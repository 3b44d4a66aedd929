use gantry_core::{ReleaseSnapshot, ValidationError, parse_host_port, vars};

/// Checks run by the `validate_configuration` step.
///
/// Stage variable names must be well-formed, the version must belong to the
/// gateway, every backend the version references needs a configuration
/// with at least one well-formed host, and every `{env.NAME}` placeholder
/// in hosts and backend paths must resolve.
pub fn validate_snapshot(snapshot: &ReleaseSnapshot) -> Result<(), ValidationError> {
    let ReleaseSnapshot {
        gateway,
        stage,
        version,
        ..
    } = snapshot;
    stage.validate_vars()?;
    if version.gateway_id != gateway.id {
        return Err(ValidationError::ForeignResourceVersion {
            version: version.version.clone(),
            gateway: gateway.name.clone(),
        });
    }

    for backend_id in version.referenced_backends() {
        let Some(entry) = snapshot.backend(backend_id) else {
            return Err(ValidationError::MissingBackendConfig {
                backend: backend_id.to_string(),
                stage: stage.name.clone(),
            });
        };
        let name = &entry.backend.name;
        let Some(first) = entry.config.hosts.first() else {
            return Err(ValidationError::EmptyBackendHosts {
                backend: name.clone(),
            });
        };
        for host in &entry.config.hosts {
            let rendered = vars::render(&host.host, &stage.vars, &format!("backend {name} host"))?;
            let malformed = |reason: String| ValidationError::MalformedHost {
                backend: name.clone(),
                host: rendered.clone(),
                reason,
            };
            if host.scheme != first.scheme {
                return Err(malformed(
                    "all hosts of a backend must share one scheme".to_owned(),
                ));
            }
            parse_host_port(&rendered).map_err(malformed)?;
        }
    }

    for resource in &version.resources {
        vars::render(
            &resource.backend_path,
            &stage.vars,
            &format!("resource {} backend path", resource.name),
        )?;
    }
    Ok(())
}
