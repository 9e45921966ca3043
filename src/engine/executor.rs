//! Workflow executor
//!
//! Walks a scheduled execution order: resolves each instance's configuration
//! against the run context, creates the component through the registry,
//! invokes it with a bound appropriate to its kind, and stores the declared
//! outputs under their (possibly aliased) keys. A failure halts every
//! remaining instance; side effects already issued are not undone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::engine::error::EngineError;
use crate::engine::result::{InstanceStatus, RunFailure, RunResult};
use crate::registry::{ComponentRegistry, ComponentSpec, IntegrationError, InvocationKind};
use crate::workflow::{ComponentInstance, WorkflowContext, WorkflowDefinition};

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Executor {
    registry: Arc<ComponentRegistry>,
    io_timeout: Duration,
}

impl Executor {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Override the timeout applied to network invocations.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Run the instances named by `order` against a shared context.
    ///
    /// `order` may be the full schedule (one-shot runs) or the action tail
    /// of it (listener-triggered runs, where the trigger's payload is
    /// already seeded into the context).
    pub async fn run(
        &self,
        def: &WorkflowDefinition,
        order: &[String],
        context: &WorkflowContext,
    ) -> RunResult {
        let mut statuses: HashMap<String, InstanceStatus> = order
            .iter()
            .map(|id| (id.clone(), InstanceStatus::NotRun))
            .collect();
        let mut failure = None;

        info!(workflow = %def.name, run_id = %context.run_id(), "starting run");

        for id in order {
            let instance = match def.instance(id) {
                Some(instance) => instance,
                None => {
                    failure = Some(RunFailure {
                        instance_id: id.clone(),
                        error: format!("instance '{}' not present in definition", id),
                    });
                    statuses.insert(id.clone(), InstanceStatus::Failed);
                    break;
                }
            };

            match self.run_instance(instance, context).await {
                Ok(()) => {
                    statuses.insert(id.clone(), InstanceStatus::Succeeded);
                    debug!(instance = %id, "instance succeeded");
                }
                Err(e) => {
                    error!(instance = %id, error = %e, "instance failed, halting remaining actions");
                    statuses.insert(id.clone(), InstanceStatus::Failed);
                    failure = Some(RunFailure {
                        instance_id: id.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        let success = failure.is_none();
        if success {
            info!(workflow = %def.name, run_id = %context.run_id(), "run completed");
        }

        RunResult {
            run_id: context.run_id().to_string(),
            success,
            statuses,
            failure,
            outputs: context.snapshot(),
        }
    }

    async fn run_instance(
        &self,
        instance: &ComponentInstance,
        context: &WorkflowContext,
    ) -> Result<(), EngineError> {
        let resolved = context.resolve_map(&instance.config)?;

        let spec = self
            .registry
            .spec(&instance.type_id)
            .ok_or_else(|| EngineError::UnknownComponentType(instance.type_id.clone()))?
            .clone();
        let component = self.registry.create(&instance.type_id, &resolved)?;

        let outputs = self.invoke(&spec, component.as_ref(), &resolved).await?;

        // Only declared outputs reach the context, under their aliased keys.
        for key in &spec.outputs {
            if let Some(value) = outputs.get(key) {
                context.set(instance.effective_output_key(key), value.clone());
            }
        }

        Ok(())
    }

    async fn invoke(
        &self,
        spec: &ComponentSpec,
        component: &dyn crate::registry::Component,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, EngineError> {
        let outputs = match spec.kind {
            InvocationKind::Pure | InvocationKind::Subscribe => component.invoke(config).await?,
            InvocationKind::Network => {
                tokio::time::timeout(self.io_timeout, component.invoke(config))
                    .await
                    .unwrap_or_else(|_| {
                        Err(IntegrationError::Timeout(self.io_timeout.as_millis() as u64))
                    })?
            }
        };
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Component, ParamKind, ParamSpec};
    use async_trait::async_trait;

    struct SlowComponent;

    #[async_trait]
    impl Component for SlowComponent {
        async fn invoke(
            &self,
            _config: &HashMap<String, String>,
        ) -> Result<HashMap<String, String>, IntegrationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HashMap::new())
        }
    }

    fn slow_registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(
            ComponentSpec::new(
                "test.trigger",
                vec![],
                vec!["message_text"],
                InvocationKind::Subscribe,
            ),
            || Box::new(SlowComponent),
        );
        registry.register(
            ComponentSpec::new(
                "test.slow",
                vec![ParamSpec::optional("url", ParamKind::String)],
                vec!["status_code"],
                InvocationKind::Network,
            ),
            || Box::new(SlowComponent),
        );
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_invocation_times_out() {
        let executor = Executor::new(Arc::new(slow_registry())).io_timeout(Duration::from_secs(1));
        let def = WorkflowDefinition::new("slow")
            .with_instance(ComponentInstance::trigger("test.trigger").with_id("t"))
            .with_instance(ComponentInstance::action("test.slow").with_id("a"));

        let context = WorkflowContext::new();
        let order = ["a".to_string()];
        let result = executor.run(&def, &order, &context).await;

        assert!(!result.success);
        assert_eq!(result.status("a"), InstanceStatus::Failed);
        let failure = result.failure.unwrap();
        assert!(failure.error.contains("timed out"), "{}", failure.error);
    }

    #[tokio::test]
    async fn test_unknown_instance_in_order_fails() {
        let executor = Executor::new(Arc::new(slow_registry()));
        let def = WorkflowDefinition::new("empty")
            .with_instance(ComponentInstance::trigger("test.trigger").with_id("t"));

        let context = WorkflowContext::new();
        let order = ["ghost".to_string()];
        let result = executor.run(&def, &order, &context).await;

        assert!(!result.success);
        assert_eq!(result.failure.unwrap().instance_id, "ghost");
    }
}
