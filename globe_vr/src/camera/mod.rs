mod fly;
mod stereo;

pub use fly::{
    apply_fly_view, exit_on_escape, fly_camera_plugin, vertical_fov, FlySpeed, FlyView,
    NavigationEvent, Tour, TourStop, INITIAL_EYE, INITIAL_FIELD_OF_VIEW, INITIAL_HEADING,
    INITIAL_PITCH, INITIAL_ROLL, SPEED_LEVELS, TOUR,
};
pub use stereo::{
    split_viewports, stereo_plugin, ActiveStereo, AnaglyphMaterial, AnaglyphScreen,
    AnaglyphTargets, EyeCamera, ViewRig,
};
