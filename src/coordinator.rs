//! Coordinator
//!
//! Composition root of the coordinator context: owns the selection registry,
//! the command table, the menu controller and the dispatcher, and drives one
//! event loop over channel traffic and platform callbacks. Each message is
//! processed fully before the next one starts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::channel::{Hub, HubEvent, Message, PortId, PortIdentity};
use crate::commands::{CommandKind, CommandSet};
use crate::config::SettingsService;
use crate::core::filter_selection_text;
use crate::dispatch::CommandDispatcher;
use crate::error::QsResult;
use crate::menu::MenuController;
use crate::platform::{ShortcutProvider, Surface, SurfaceHost};
use crate::registry::SelectionRegistry;

pub struct Coordinator {
    hub: Hub,
    events_rx: UnboundedReceiver<HubEvent>,
    registry: SelectionRegistry,
    commands: CommandSet,
    menu: MenuController,
    dispatcher: CommandDispatcher,
    settings: SettingsService,
    surfaces: Arc<dyn SurfaceHost>,
    shortcuts: Arc<dyn ShortcutProvider>,
    /// Identity assigned to each open port at connect time.
    ports: HashMap<PortId, PortIdentity>,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hub: Hub,
        events_rx: UnboundedReceiver<HubEvent>,
        menu: MenuController,
        dispatcher: CommandDispatcher,
        settings: SettingsService,
        surfaces: Arc<dyn SurfaceHost>,
        shortcuts: Arc<dyn ShortcutProvider>,
    ) -> Self {
        Self {
            hub,
            events_rx,
            registry: SelectionRegistry::new(),
            commands: CommandSet::new(),
            menu,
            dispatcher,
            settings,
            surfaces,
            shortcuts,
            ports: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SelectionRegistry {
        &self.registry
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn settings_mut(&mut self) -> &mut SettingsService {
        &mut self.settings
    }

    /// Runs the event loop until every opener handle is gone.
    pub async fn run(&mut self) -> QsResult<()> {
        while let Some(event) = self.events_rx.recv().await {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    /// Drains events already queued, without waiting for more.
    pub async fn drain(&mut self) -> QsResult<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: HubEvent) -> QsResult<()> {
        match event {
            HubEvent::Connected { port, identity, name } => {
                debug!(port, ?identity, name, "Context connected");
                self.ports.insert(port, identity);
                // Pick up any shortcut reconfiguration made while no
                // context was connected.
                self.refresh_shortcuts().await?;
            }
            HubEvent::Message { port, message } => {
                self.handle_message(port, message).await?;
            }
            HubEvent::Disconnected { port } => {
                debug!(port, "Context disconnected");
                self.ports.remove(&port);
            }
        }
        Ok(())
    }

    async fn handle_message(&mut self, port: PortId, message: Message) -> QsResult<()> {
        let Some(sender) = self.ports.get(&port).copied() else {
            warn!(port, ?message, "Ignore message from an unknown port");
            return Ok(());
        };

        match message {
            Message::Hello => {
                self.hub.post(port, Message::Welcome { identity: sender });
            }
            Message::NotifySelectionUpdated { reason, selection } => {
                debug!(?reason, ?sender, "Selection updated");
                self.registry.on_selection_notify(&selection, sender);
                self.sync_menu()?;
            }
            Message::DoQuotedSearch { selection_text, key_state } => {
                let Some(surface) = self.surfaces.surface(sender.surface_id).await? else {
                    info!(?sender, "Ignore quoted search from a vanished surface");
                    return Ok(());
                };
                self.dispatcher
                    .do_quoted_search(&surface, &selection_text, key_state, self.settings.values())
                    .await?;
            }
            Message::OpenOptionsPage { key_state, default_how_to_open } => {
                let Some(surface) = self.surfaces.surface(sender.surface_id).await? else {
                    info!(?sender, "Ignore options-page request from a vanished surface");
                    return Ok(());
                };
                self.dispatcher
                    .open_options_page(&surface, key_state, default_how_to_open)
                    .await?;
            }
            Message::GetSelection { tab } => {
                self.hub.post(
                    port,
                    Message::NotifySelection {
                        selection: self.registry.read(tab),
                    },
                );
            }
            other @ (Message::Welcome { .. }
            | Message::NotifySelection { .. }
            | Message::PutQuotes) => {
                warn!(?other, ?sender, "Ignore message not addressed to the coordinator");
            }
        }
        Ok(())
    }

    /// A keyboard shortcut was pressed. `surface` is absent for global
    /// shortcuts; the active surface stands in then.
    pub async fn on_shortcut_pressed(
        &mut self,
        kind: CommandKind,
        surface: Option<Surface>,
    ) -> QsResult<()> {
        let surface = match surface {
            Some(surface) => surface,
            None => match self.surfaces.active_surface().await? {
                Some(surface) => surface,
                None => {
                    debug!("Ignore keyboard shortcut because no active surface could be obtained");
                    return Ok(());
                }
            },
        };

        if !self.registry.is_owner(surface.id, None) {
            debug!(?kind, surface = surface.id, "Ignore keyboard shortcut from a non-owner surface");
            return Ok(());
        }
        if self.registry.current().blur {
            debug!(?kind, "Ignore keyboard shortcut because the current selection is blurred");
            return Ok(());
        }

        match kind {
            CommandKind::DoQuotedSearch => {
                let text = self.registry.current().text.clone();
                self.dispatcher
                    .do_quoted_search(&surface, &text, None, self.settings.values())
                    .await?;
            }
            CommandKind::PutQuotes => {
                if let Some(owner) = self.registry.current().owner {
                    self.send_put_quotes(owner.surface_id, owner.frame_id);
                }
            }
        }
        Ok(())
    }

    /// A context-menu entry was clicked in a given frame.
    pub async fn on_menu_clicked(
        &mut self,
        kind: CommandKind,
        surface: Surface,
        frame_id: u32,
        selection_text: Option<&str>,
    ) -> QsResult<()> {
        if !self.registry.is_owner(surface.id, Some(frame_id)) {
            debug!(
                ?kind,
                surface = surface.id,
                frame_id,
                "Ignore menu click from a non-owner context"
            );
            return Ok(());
        }
        if !self.commands.get(kind).menu_registered {
            warn!(?kind, "Unregistered context menu was invoked");
        }

        match kind {
            CommandKind::DoQuotedSearch => {
                let text = filter_selection_text(selection_text);
                self.dispatcher
                    .do_quoted_search(&surface, &text, None, self.settings.values())
                    .await?;
            }
            CommandKind::PutQuotes => {
                self.send_put_quotes(surface.id, frame_id);
            }
        }
        Ok(())
    }

    /// Settings changed externally; menu visibility may be affected.
    pub fn on_settings_changed(&mut self, new_value: Option<&serde_json::Value>) -> QsResult<()> {
        self.settings.handle_external_change(new_value);
        self.sync_menu()
    }

    fn send_put_quotes(&self, surface_id: u32, frame_id: u32) {
        match self.hub.find_port(surface_id, frame_id) {
            Some(port) => self.hub.post(port, Message::PutQuotes),
            None => info!(
                surface_id,
                frame_id, "⚠️ Put-quotes target has no open channel"
            ),
        }
    }

    fn sync_menu(&mut self) -> QsResult<()> {
        self.menu
            .sync(&mut self.commands, self.registry.current(), self.settings.values())
    }

    async fn refresh_shortcuts(&mut self) -> QsResult<()> {
        let shortcuts = self.shortcuts.shortcuts().await?;
        self.commands.set_shortcuts(&shortcuts);
        Ok(())
    }
}
