use crate::rm::Resource;

/// Clamps a requested capability component-wise to the cluster-advertised
/// maximum. A resource ask cannot exceed the maximum; asks above it are
/// lowered and logged rather than rejected.
pub fn negotiate(requested: Resource, max: Resource) -> Resource {
    let mut effective = requested;

    if requested.memory_mb > max.memory_mb {
        log::info!(
            "Requested memory is above the cluster maximum, using the maximum: requested={} MB, max={} MB",
            requested.memory_mb,
            max.memory_mb
        );
        effective.memory_mb = max.memory_mb;
    }

    if requested.vcores > max.vcores {
        log::info!(
            "Requested virtual cores are above the cluster maximum, using the maximum: requested={}, max={}",
            requested.vcores,
            max.vcores
        );
        effective.vcores = max.vcores;
    }

    effective
}
