use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::matchmaking::{MatchCoordinator, SharedQueue};
use crate::models::{AppState, ClientCommand, ServerEvent};
use crate::websocket::controller::{Effect, PlayerController};
use crate::websocket::hub::{Delivery, Publish, Subscribe, Unsubscribe};

/// WebSocket session for one player
pub struct PlayerSocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    controller: PlayerController<SharedQueue>,
    bot_timer: Option<SpawnHandle>,
    join_timer: Option<SpawnHandle>,
}

impl PlayerSocket {
    pub fn new(id: String, label: String, app_state: web::Data<AppState>) -> Self {
        let config = &app_state.config;
        let coordinator = MatchCoordinator::with_session_id(id.clone(), label, app_state.queue.clone());
        let controller = PlayerController::new(coordinator, config.default_difficulty, config.join_timeout());
        Self {
            id,
            controller,
            bot_timer: None,
            join_timer: None,
            app_state,
        }
    }

    fn send_event(&self, event: &ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("Failed to serialize event for {}: {}", self.id, e),
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>, ctx: &mut ws::WebsocketContext<Self>) {
        for effect in effects {
            match effect {
                Effect::Notify(event) => self.send_event(&event, ctx),
                Effect::Broadcast(envelope) => self.app_state.hub.do_send(Publish(envelope)),
                Effect::ScheduleBotReply(delay) => {
                    if let Some(handle) = self.bot_timer.take() {
                        ctx.cancel_future(handle);
                    }
                    self.bot_timer = Some(ctx.run_later(delay, |act, ctx| {
                        act.bot_timer = None;
                        let effects = act.controller.bot_reply();
                        act.run_effects(effects, ctx);
                    }));
                }
                Effect::CancelBotReply => {
                    if let Some(handle) = self.bot_timer.take() {
                        ctx.cancel_future(handle);
                    }
                }
                Effect::ScheduleJoinTimeout { match_id, after } => {
                    if let Some(handle) = self.join_timer.take() {
                        ctx.cancel_future(handle);
                    }
                    self.join_timer = Some(ctx.run_later(after, move |act, ctx| {
                        act.join_timer = None;
                        let effects = act.controller.join_timed_out(&match_id);
                        act.run_effects(effects, ctx);
                    }));
                }
                Effect::RecordCapture(record) => self.app_state.ledger.record(record),
            }
        }
    }
}

impl Actor for PlayerSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.app_state.hub.do_send(Subscribe {
            id: self.id.clone(),
            recipient: ctx.address().recipient(),
        });
        info!("WebSocket connection started: {}", self.id);

        ctx.run_interval(self.app_state.config.queue_poll(), |act, ctx| {
            let effects = act.controller.refresh_waiting();
            act.run_effects(effects, ctx);
        });

        let welcome = ServerEvent::State(self.controller.snapshot());
        self.send_event(&welcome, ctx);
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        let effects = self.controller.disconnect();
        self.run_effects(effects, ctx);
        self.app_state.hub.do_send(Unsubscribe { id: self.id.clone() });
        info!("WebSocket connection closed: {}", self.id);
        Running::Stop
    }
}

impl Handler<Delivery> for PlayerSocket {
    type Result = ();

    fn handle(&mut self, msg: Delivery, ctx: &mut Self::Context) {
        let effects = self.controller.handle_envelope(&msg.0);
        self.run_effects(effects, ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientCommand>(text.as_ref()) {
                Ok(command) => {
                    info!("Session {} sent {:?}", self.id, command);
                    let effects = self.controller.handle_command(command);
                    self.run_effects(effects, ctx);
                }
                Err(e) => {
                    warn!("Error parsing client message: {}", e);
                    self.send_event(&ServerEvent::error(format!("Invalid message format: {}", e)), ctx);
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send_event(&ServerEvent::error("Binary messages are not supported"), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ConnectParams {
    pub label: Option<String>,
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    params: web::Query<ConnectParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = Uuid::new_v4().to_string();
    let label = params
        .into_inner()
        .label
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| format!("Player-{}", &id[..8]));
    info!("New WebSocket connection {} ({})", id, label);

    ws::start(PlayerSocket::new(id, label, app_state), &req, stream)
}
