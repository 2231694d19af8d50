//! Hex battlefield viewer.
//!
//! Renders a noise-generated tactical scenario and a campaign map, with
//! click-to-select, attack and move animations, and turn-driven aftermath.

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use hex_battlefield::GameState;
use hex_battlefield::battlefield::BattlefieldConfig;
use hex_battlefield::demo::{self, DemoSettings};
use hex_battlefield::presenter::BattlefieldPlugin;

/// Command-line flags for the demo scenario.
#[cfg(feature = "native")]
#[derive(clap::Parser, Debug)]
#[command(name = "hex-battlefield", about = "Hex battlefield viewer")]
struct Args {
    /// Tactical grid columns
    #[arg(long, default_value_t = 16)]
    cols: i32,

    /// Tactical grid rows
    #[arg(long, default_value_t = 10)]
    rows: i32,

    /// Seed for terrain noise and unit placement
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Hex radius in pixels
    #[arg(long, default_value_t = 32.0)]
    hex_radius: f32,

    /// Hide hex coordinate labels
    #[arg(long)]
    no_labels: bool,
}

fn settings() -> (BattlefieldConfig, DemoSettings) {
    #[allow(unused_mut)]
    let mut config = BattlefieldConfig::default();
    #[allow(unused_mut)]
    let mut demo = DemoSettings::default();
    #[cfg(feature = "native")]
    {
        use clap::Parser;
        let args = Args::parse();
        demo.cols = args.cols.max(1);
        demo.rows = args.rows.max(1);
        demo.seed = args.seed;
        config.grid.hex_radius = args.hex_radius.max(4.0);
        config.grid.show_labels = !args.no_labels;
    }
    (config, demo)
}

fn main() {
    let (config, demo_settings) = settings();
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Battlefield".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .register_type::<DemoSettings>()
    .init_state::<GameState>()
    .insert_resource(demo_settings)
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(BattlefieldPlugin(config))
    .add_systems(Startup, demo::load_demo)
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
