//! Builder for Azure Resource Manager resource paths.

use std::fmt;

/// A resource path such as
/// `/subscriptions/{id}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`.
///
/// # Example
///
/// ```rust
/// use azure_mgmt_resources::resource_id::ResourceId;
///
/// let host = ResourceId::subscription("sub-1")
///     .resource_group("myResourceGroup")
///     .provider("Microsoft.Compute")
///     .resource("hostGroups", "myDedicatedHostGroup")
///     .resource("hosts", "myHost");
///
/// assert_eq!(
///     host.to_string(),
///     "/subscriptions/sub-1/resourceGroups/myResourceGroup/providers/Microsoft.Compute/hostGroups/myDedicatedHostGroup/hosts/myHost"
/// );
/// assert_eq!(host.name(), Some("myHost"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    subscription_id: String,
    resource_group: Option<String>,
    provider: Option<String>,
    segments: Vec<String>,
}

impl ResourceId {
    /// Start at a subscription.
    pub fn subscription(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: None,
            provider: None,
            segments: Vec::new(),
        }
    }

    /// Scope to a resource group.
    pub fn resource_group(mut self, name: impl Into<String>) -> Self {
        self.resource_group = Some(name.into());
        self
    }

    /// Set the resource provider namespace, e.g. `Microsoft.Compute`.
    pub fn provider(mut self, namespace: impl Into<String>) -> Self {
        self.provider = Some(namespace.into());
        self
    }

    /// Append a `{type}/{name}` pair. Repeat for child resources.
    pub fn resource(mut self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        self.segments.push(resource_type.into());
        self.segments.push(name.into());
        self
    }

    /// Append a trailing resource type, addressing a collection for listing.
    pub fn collection(mut self, resource_type: impl Into<String>) -> Self {
        self.segments.push(resource_type.into());
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    /// Name of the innermost resource, if the path addresses one.
    pub fn name(&self) -> Option<&str> {
        if self.segments.len() % 2 == 0 {
            self.segments.last().map(String::as_str)
        } else {
            None
        }
    }

    /// The path with an explicit `api-version` query parameter.
    pub fn with_api_version(&self, api_version: &str) -> String {
        format!("{self}?api-version={api_version}")
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{rg}")?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{provider}")?;
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_and_group_paths() {
        assert_eq!(
            ResourceId::subscription("sub").to_string(),
            "/subscriptions/sub"
        );
        let rg = ResourceId::subscription("sub").resource_group("rg");
        assert_eq!(rg.to_string(), "/subscriptions/sub/resourceGroups/rg");
        assert_eq!(rg.resource_group_name(), Some("rg"));
        assert_eq!(rg.name(), None);
    }

    #[test]
    fn collection_path_has_no_name() {
        let hosts = ResourceId::subscription("sub")
            .resource_group("rg")
            .provider("Microsoft.Compute")
            .resource("hostGroups", "hg")
            .collection("hosts");
        assert_eq!(
            hosts.to_string(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/hostGroups/hg/hosts"
        );
        assert_eq!(hosts.name(), None);
    }

    #[test]
    fn subscription_scoped_provider_resource() {
        let workspaces = ResourceId::subscription("sub")
            .provider("Microsoft.MachineLearningServices")
            .collection("workspaces");
        assert_eq!(
            workspaces.with_api_version("2022-05-01"),
            "/subscriptions/sub/providers/Microsoft.MachineLearningServices/workspaces?api-version=2022-05-01"
        );
    }
}
