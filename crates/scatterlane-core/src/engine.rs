use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    fanout::ContainerPlan,
    generation::{
        self, GenerationContext, GenerationError, GenerationOptions, GenerationScope,
        GenerationSummary,
    },
    host::TimelineHost,
    model::{ChannelMode, Container, GenerationSettings, Group, Session, SoundAsset},
    persistence,
    time::TimeWindow,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("group not found: {0}")]
    GroupNotFound(Uuid),
    #[error("container not found: {0}")]
    ContainerNotFound(Uuid),
    #[error("invalid reorder from {from} to {to}")]
    InvalidReorder { from: usize, to: usize },
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddContainerRequest {
    pub group_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub items: Vec<SoundAsset>,
    #[serde(default)]
    pub override_parent: bool,
    #[serde(default)]
    pub channel_mode: ChannelMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerPatch {
    pub name: Option<String>,
    pub override_parent: Option<bool>,
    pub channel_mode: Option<ChannelMode>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    session: Session,
    options: GenerationOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Session::new("Untitled"))
    }
}

impl Engine {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            options: GenerationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn replace_session(&mut self, session: Session) {
        self.session = session;
        info!(session_id = %self.session.id, "session replaced");
    }

    #[instrument(skip(self), fields(session_id = %self.session.id, group_name = %name))]
    pub fn add_group(&mut self, name: String) -> Group {
        let group = Group::new(name);
        self.session.groups.push(group.clone());
        self.session.touch();
        info!(group_id = %group.id, "group added");
        group
    }

    #[instrument(skip(self), fields(session_id = %self.session.id, group_id = %group_id))]
    pub fn remove_group(&mut self, group_id: Uuid) -> Result<(), EngineError> {
        let before = self.session.groups.len();
        self.session.groups.retain(|group| group.id != group_id);
        if self.session.groups.len() == before {
            return Err(EngineError::GroupNotFound(group_id));
        }
        self.session.touch();
        info!("group removed");
        Ok(())
    }

    #[instrument(skip(self, settings), fields(session_id = %self.session.id, group_id = %group_id))]
    pub fn set_group_settings(
        &mut self,
        group_id: Uuid,
        settings: GenerationSettings,
    ) -> Result<(), EngineError> {
        self.group_mut(group_id)?.settings = settings;
        self.session.touch();
        info!("group settings updated");
        Ok(())
    }

    #[instrument(skip(self, request), fields(session_id = %self.session.id, group_id = %request.group_id, container_name = %request.name))]
    pub fn add_container(
        &mut self,
        request: AddContainerRequest,
    ) -> Result<Container, EngineError> {
        let group = self.group_mut(request.group_id)?;
        let container = Container {
            override_parent: request.override_parent,
            channel_mode: request.channel_mode,
            ..Container::new(request.name).with_items(request.items)
        };
        group.containers.push(container.clone());
        self.session.touch();
        info!(container_id = %container.id, items = container.items.len(), "container added");
        Ok(container)
    }

    #[instrument(skip(self), fields(session_id = %self.session.id, group_id = %group_id, container_id = %container_id))]
    pub fn remove_container(
        &mut self,
        group_id: Uuid,
        container_id: Uuid,
    ) -> Result<(), EngineError> {
        let group = self.group_mut(group_id)?;
        let before = group.containers.len();
        group
            .containers
            .retain(|container| container.id != container_id);
        if group.containers.len() == before {
            return Err(EngineError::ContainerNotFound(container_id));
        }
        self.session.touch();
        info!("container removed");
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %self.session.id, group_id = %group_id, from, to))]
    pub fn reorder_container(
        &mut self,
        group_id: Uuid,
        from: usize,
        to: usize,
    ) -> Result<(), EngineError> {
        let group = self.group_mut(group_id)?;
        if from >= group.containers.len() || to >= group.containers.len() {
            return Err(EngineError::InvalidReorder { from, to });
        }
        if from == to {
            debug!("reorder noop");
            return Ok(());
        }

        let container = group.containers.remove(from);
        group.containers.insert(to, container);
        self.session.touch();
        info!("container reordered");
        Ok(())
    }

    #[instrument(skip(self, patch), fields(session_id = %self.session.id, group_id = %group_id, container_id = %container_id))]
    pub fn patch_container(
        &mut self,
        group_id: Uuid,
        container_id: Uuid,
        patch: ContainerPatch,
    ) -> Result<Container, EngineError> {
        let updated = {
            let container = self.container_mut(group_id, container_id)?;
            if let Some(name) = patch.name {
                container.name = name;
            }
            if let Some(override_parent) = patch.override_parent {
                container.override_parent = override_parent;
            }
            if let Some(channel_mode) = patch.channel_mode {
                container.channel_mode = channel_mode;
            }
            container.clone()
        };
        self.session.touch();
        info!(
            override_parent = updated.override_parent,
            channel_mode = ?updated.channel_mode,
            "container patched"
        );
        Ok(updated)
    }

    #[instrument(skip(self, settings), fields(session_id = %self.session.id, group_id = %group_id, container_id = %container_id))]
    pub fn set_container_settings(
        &mut self,
        group_id: Uuid,
        container_id: Uuid,
        settings: GenerationSettings,
    ) -> Result<(), EngineError> {
        self.container_mut(group_id, container_id)?.settings = settings;
        self.session.touch();
        info!("container settings updated");
        Ok(())
    }

    #[instrument(skip(self, items), fields(session_id = %self.session.id, container_id = %container_id, items = items.len()))]
    pub fn set_container_items(
        &mut self,
        group_id: Uuid,
        container_id: Uuid,
        items: Vec<SoundAsset>,
    ) -> Result<(), EngineError> {
        self.container_mut(group_id, container_id)?.items = items;
        self.session.touch();
        info!("container items replaced");
        Ok(())
    }

    /// Regenerates `scope` on `host` and reports what was skipped.
    pub fn generate<H: TimelineHost + ?Sized>(
        &self,
        host: &mut H,
        window: TimeWindow,
        scope: GenerationScope,
    ) -> Result<GenerationSummary, GenerationError> {
        GenerationContext::new(&self.session, host, self.options).generate(window, scope)
    }

    pub fn generate_session<H: TimelineHost + ?Sized>(
        &self,
        host: &mut H,
        window: TimeWindow,
    ) -> Result<GenerationSummary, GenerationError> {
        self.generate(host, window, GenerationScope::Session)
    }

    pub fn generate_group<H: TimelineHost + ?Sized>(
        &self,
        host: &mut H,
        window: TimeWindow,
        group_id: Uuid,
    ) -> Result<GenerationSummary, GenerationError> {
        self.generate(host, window, GenerationScope::Group { group_id })
    }

    pub fn generate_container<H: TimelineHost + ?Sized>(
        &self,
        host: &mut H,
        window: TimeWindow,
        group_id: Uuid,
        container_id: Uuid,
    ) -> Result<GenerationSummary, GenerationError> {
        self.generate(
            host,
            window,
            GenerationScope::Container {
                group_id,
                container_id,
            },
        )
    }

    /// Placement for `scope` without touching any host.
    pub fn plan(
        &self,
        window: TimeWindow,
        scope: GenerationScope,
    ) -> Result<Vec<ContainerPlan>, GenerationError> {
        generation::plan_scope(&self.session, scope, window, &self.options)
    }

    #[instrument(skip(self), fields(session_id = %self.session.id, path = %path.display()))]
    pub fn save_session(&self, path: &Path) -> Result<(), EngineError> {
        persistence::save_session(path, &self.session)?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load_session(&mut self, path: &Path) -> Result<Session, EngineError> {
        let session = persistence::load_session(path)?;
        self.replace_session(session.clone());
        Ok(session)
    }

    fn group_mut(&mut self, group_id: Uuid) -> Result<&mut Group, EngineError> {
        self.session
            .group_mut(group_id)
            .ok_or(EngineError::GroupNotFound(group_id))
    }

    fn container_mut(
        &mut self,
        group_id: Uuid,
        container_id: Uuid,
    ) -> Result<&mut Container, EngineError> {
        self.group_mut(group_id)?
            .container_mut(container_id)
            .ok_or(EngineError::ContainerNotFound(container_id))
    }
}
