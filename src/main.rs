//! WorldVR demo. Runs the globe_vr app.

use bevy::app::AppExit;
use globe_vr::prelude::*;

fn main() -> AppExit {
    let _ = dotenvy::dotenv();
    let config = viewer_config();

    WorldVrBuilder::new().config(config).build().run()
}
