//! World state and the per-frame simulation step.
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::console::{Command, Console, Submission, HELP};
use crate::core::maze::TileMap;
use crate::core::network::{NetEvent, Network, SERVER_PLAYER_ID};
use crate::core::packet::PoseUpdate;
use crate::core::player::Player;
use crate::core::process_events::{apply_input, release, InputState};
use crate::render::casters::ViewSettings;
use crate::render::depth::DepthBuffer;
use crate::render::sprites::target_under_crosshair;

/// The local player is always the first entry of [`Game::players`].
pub const LOCAL: usize = 0;

/// Things the window layer has to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Quit,
    ToggleFullscreen,
    /// The local player was shot and respawned.
    Respawned,
    ChatReceived(String),
}

pub struct Game {
    pub map: TileMap,
    pub players: Vec<Player>,
    pub console: Console,
    pub network: Network,
    pub config: Config,
    pub view: ViewSettings,
    screen: (u32, u32),
    rng: StdRng,
}

impl Game {
    pub fn new(map: TileMap, config: Config, mut rng: StdRng) -> Self {
        let screen = (config.screen_width, config.screen_height);
        let view = config.view_settings(screen.0, screen.1);
        let mut local = Player::new(SERVER_PLAYER_ID, 1.5, 1.5, 0.0);
        local.name.clone_from(&config.player_name);
        local.random_spawn(&map, &mut rng);
        info!(x = local.x, y = local.y, "spawned");
        Self {
            map,
            players: vec![local],
            console: Console::new(),
            network: Network::new(),
            config,
            view,
            screen,
            rng,
        }
    }

    pub fn local_player(&self) -> &Player {
        &self.players[LOCAL]
    }

    /// Screen size changed; the field of view follows unless it was set explicitly.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen = (width, height);
        self.view = self.config.view_settings(width, height);
    }

    /// One simulation step: input, movement, network traffic.
    pub fn tick(&mut self, input: &InputState) -> Vec<GameEvent> {
        let local = &mut self.players[LOCAL];
        if self.console.entry_active() {
            release(local);
        } else {
            apply_input(local, input, self.config.mouse_sensitivity);
        }
        local.update_position(&self.map);

        let mut events = Vec::new();
        for event in self.network.poll() {
            if let Some(e) = self.apply_net_event(event) {
                events.push(e);
            }
        }
        if !self.network.is_online() && self.players.len() > 1 {
            // The session ended underneath us.
            self.players.truncate(1);
        }

        if self.network.is_online() {
            let p = &self.players[LOCAL];
            self.network.send_pose(PoseUpdate {
                player_id: p.id,
                x: p.x,
                y: p.y,
                angle: p.angle,
            });
        }
        events
    }

    pub fn apply_net_event(&mut self, event: NetEvent) -> Option<GameEvent> {
        match event {
            NetEvent::Connected { player_id, name } => {
                self.console.push(&format!("{name} joined"));
                let mut p = Player::new(player_id, 1.5, 1.5, 0.0);
                p.name = name;
                self.upsert(p);
                None
            }
            NetEvent::Chat { text } => {
                self.console.push(&text);
                Some(GameEvent::ChatReceived(text))
            }
            NetEvent::Pose(pose) => {
                match self.remote_mut(pose.player_id) {
                    Some(p) => {
                        p.x = pose.x;
                        p.y = pose.y;
                        p.angle = pose.angle;
                    }
                    None => self.upsert(Player::new(pose.player_id, pose.x, pose.y, pose.angle)),
                }
                None
            }
            NetEvent::Hit { player_id } if player_id == self.players[LOCAL].id => {
                self.console.push("You were shot!");
                let local = &mut self.players[LOCAL];
                local.random_spawn(&self.map, &mut self.rng);
                Some(GameEvent::Respawned)
            }
            NetEvent::Hit { .. } => None,
            NetEvent::Disconnected { player_id } => {
                if let Some(i) = self.remote_index(player_id) {
                    let p = self.players.remove(i);
                    self.console.push(&format!("{} left", p.name));
                }
                if player_id == SERVER_PLAYER_ID && !self.network.is_online() {
                    self.console.push("Disconnected from server");
                }
                None
            }
        }
    }

    fn remote_index(&self, player_id: u8) -> Option<usize> {
        self.players
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, p)| p.id == player_id)
            .map(|(i, _)| i)
    }

    fn remote_mut(&mut self, player_id: u8) -> Option<&mut Player> {
        let i = self.remote_index(player_id)?;
        Some(&mut self.players[i])
    }

    fn upsert(&mut self, player: Player) {
        if player.id == self.players[LOCAL].id {
            return;
        }
        match self.remote_index(player.id) {
            Some(i) => self.players[i] = player,
            None => self.players.push(player),
        }
    }

    /// Fires at the centre of the screen using the depth buffer of the last frame.
    /// Returns the id of the player that was hit.
    pub fn shoot(&mut self, depth: &DepthBuffer, sprite_size: u32) -> Option<u8> {
        let (width, height) = self.screen;
        let target = target_under_crosshair(
            depth,
            &self.players,
            LOCAL,
            sprite_size,
            width,
            height,
            &self.view,
        )?;
        let victim = &mut self.players[target];
        let id = victim.id;
        info!(player_id = id, name = %victim.name, "hit");
        victim.random_spawn(&self.map, &mut self.rng);
        self.network.send_hit(id);
        Some(id)
    }

    /// Handles the console entry line after Enter.
    pub fn submit_console(&mut self) -> Option<GameEvent> {
        match self.console.submit_entry() {
            Submission::Command(command) => self.execute(command),
            Submission::Chat(text) => {
                let line = format!("{}: {}", self.players[LOCAL].name, text);
                self.console.push(&line);
                self.network.send_chat(&line);
                None
            }
            Submission::Empty => None,
        }
    }

    pub fn execute(&mut self, command: Command) -> Option<GameEvent> {
        match command {
            Command::Quit => return Some(GameEvent::Quit),
            Command::Echo(text) => self.console.push(&text),
            Command::Host(port) => {
                let port = port.unwrap_or(self.config.port);
                match self.network.host(port) {
                    Ok(addr) => {
                        self.become_player(SERVER_PLAYER_ID);
                        self.console.push(&format!("Hosting on port {}", addr.port()));
                    }
                    Err(e) => {
                        warn!("host failed: {e:#}");
                        self.console.push(&format!("{e:#}"));
                    }
                }
            }
            Command::Join(address) => {
                self.console.push(&format!("Connecting to {address}..."));
                let name = self.players[LOCAL].name.clone();
                match self.network.join(&address, &name) {
                    Ok(player_id) => {
                        self.become_player(player_id);
                        self.console.push(&format!("Connected as player {player_id}"));
                    }
                    Err(e) => {
                        warn!("join failed: {e:#}");
                        self.console.push(&format!("{e:#}"));
                    }
                }
            }
            Command::Name(name) => {
                self.console.push(&format!("Name set to {name}"));
                self.players[LOCAL].name.clone_from(&name);
                self.config.player_name = name;
            }
            Command::Fov(fov) => {
                self.config.fov = Some(fov);
                self.view.fov = fov;
            }
            Command::ViewAccuracy(step) => {
                self.config.view_accuracy = step;
                self.view.view_accuracy = step;
            }
            Command::ViewDistance(distance) => {
                self.config.view_distance = distance;
                self.view.view_distance = distance;
            }
            Command::Fullscreen => return Some(GameEvent::ToggleFullscreen),
            Command::Clear => self.console.clear(),
            Command::Help => HELP.iter().for_each(|line| self.console.push(line)),
            Command::Invalid { usage } => self.console.push(usage),
            Command::Unknown(name) => self.console.push(&format!("Unknown command: /{name}")),
        }
        None
    }

    /// Starts a fresh session as `player_id`; remote players from an old session go away.
    fn become_player(&mut self, player_id: u8) {
        self.players.truncate(1);
        let local = &mut self.players[LOCAL];
        local.id = player_id;
        local.sprite_index = player_id as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const ROOM: &str = "\
1111111111
1        1
1        1
1        1
1111111111";

    fn game() -> Game {
        let map = TileMap::parse(ROOM).unwrap();
        Game::new(map, Config::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn spawns_in_an_open_cell() {
        let g = game();
        let p = g.local_player();
        assert!(g.map.is_empty(p.x.floor() as i32, p.y.floor() as i32));
        assert_eq!(p.name, Config::default().player_name);
    }

    #[test]
    fn console_swallows_movement() {
        let mut g = game();
        g.players[LOCAL].x = 5.5;
        g.players[LOCAL].y = 2.5;
        g.players[LOCAL].angle = 0.0;
        g.console.open();
        let forward = InputState {
            forward: true,
            ..Default::default()
        };
        g.tick(&forward);
        assert_eq!(g.local_player().x, 5.5);

        g.console.close();
        g.tick(&forward);
        assert!(g.local_player().x > 5.5);
    }

    #[test]
    fn view_commands_update_config_live() {
        let mut g = game();
        g.execute(Command::Fov(1.0));
        g.execute(Command::ViewDistance(5.0));
        g.execute(Command::ViewAccuracy(0.05));
        assert_eq!(g.view.fov, 1.0);
        assert_eq!(g.config.view_distance, 5.0);
        assert_eq!(g.view.view_accuracy, 0.05);
        // An explicit fov survives a resize.
        g.resize(1000, 500);
        assert_eq!(g.view.fov, 1.0);
    }

    #[test]
    fn chat_and_commands_from_the_entry_line() {
        let mut g = game();
        g.console.open();
        "/name ada".chars().for_each(|c| g.console.push_char(c));
        assert_eq!(g.submit_console(), None);
        assert_eq!(g.local_player().name, "ada");

        g.console.open();
        "hi".chars().for_each(|c| g.console.push_char(c));
        g.submit_console();
        assert_eq!(g.console.lines().next(), Some("ada: hi"));

        assert_eq!(g.execute(Command::Quit), Some(GameEvent::Quit));
        assert_eq!(g.execute(Command::Fullscreen), Some(GameEvent::ToggleFullscreen));
    }

    #[test]
    fn remote_poses_create_and_move_players() {
        let mut g = game();
        let pose = PoseUpdate {
            player_id: 3,
            x: 2.5,
            y: 1.5,
            angle: 0.5,
        };
        g.apply_net_event(NetEvent::Pose(pose));
        assert_eq!(g.players.len(), 2);
        g.apply_net_event(NetEvent::Pose(PoseUpdate { x: 4.5, ..pose }));
        assert_eq!(g.players.len(), 2);
        assert_eq!(g.players[1].x, 4.5);

        // Our own id is never duplicated.
        g.apply_net_event(NetEvent::Pose(PoseUpdate {
            player_id: g.local_player().id,
            ..pose
        }));
        assert_eq!(g.players.len(), 2);

        g.apply_net_event(NetEvent::Disconnected { player_id: 3 });
        assert_eq!(g.players.len(), 1);
    }

    #[test]
    fn being_hit_respawns() {
        let mut g = game();
        let id = g.local_player().id;
        assert_eq!(
            g.apply_net_event(NetEvent::Hit { player_id: id }),
            Some(GameEvent::Respawned)
        );
        assert_eq!(g.apply_net_event(NetEvent::Hit { player_id: id + 1 }), None);
    }

    #[test]
    fn shooting_hits_the_player_in_front() {
        let mut g = game();
        g.players[LOCAL].x = 1.5;
        g.players[LOCAL].y = 2.5;
        g.players[LOCAL].angle = 0.0;
        g.apply_net_event(NetEvent::Pose(PoseUpdate {
            player_id: 4,
            x: 5.5,
            y: 2.5,
            angle: 0.0,
        }));
        let depth = DepthBuffer::new(g.config.screen_width);
        assert_eq!(g.shoot(&depth, 64), Some(4));

        // Nothing to hit when facing away.
        g.players[1].x = 5.5;
        g.players[1].y = 2.5;
        g.players[LOCAL].angle = std::f32::consts::PI;
        assert_eq!(g.shoot(&depth, 64), None);
    }
}
