//! Demo focus stage and XY stage.
//!
//! Positions are instantaneous; both stages report positions relative to a
//! movable origin and reject targets outside their travel range.

use crate::device::{demo, DemoDevice, Kind};
use mmdevice_sys::*;
use std::ffi::{c_double, c_int, c_long};

const STEP_SIZE_UM: f64 = 0.1;
const FOCUS_TRAVEL_UM: (f64, f64) = (0.0, 10_000.0);
const XY_TRAVEL_UM: (f64, f64) = (-50_000.0, 50_000.0);

fn within(travel: (f64, f64), position: f64) -> bool {
    position >= travel.0 && position <= travel.1
}

fn to_steps(um: f64) -> c_long {
    (um / STEP_SIZE_UM).round() as c_long
}

// =============================================================================
// Focus stage
// =============================================================================

#[derive(Debug)]
pub(crate) struct Stage {
    /// Absolute position in micrometres.
    position_um: f64,
    origin_um: f64,
    focus_direction: c_int,
}

impl Stage {
    pub fn new() -> Self {
        Self {
            position_um: 0.0,
            origin_um: 0.0,
            focus_direction: FOCUS_DIRECTION_TOWARD_SAMPLE,
        }
    }

    fn position(&self) -> f64 {
        self.position_um - self.origin_um
    }

    fn move_to(&mut self, position: f64) -> c_int {
        let absolute = position + self.origin_um;
        if !within(FOCUS_TRAVEL_UM, absolute) {
            return DEVICE_UNKNOWN_POSITION;
        }
        self.position_um = absolute;
        DEVICE_OK
    }
}

unsafe fn with_stage<T>(dev: *mut RawDevice, fallback: T, f: impl FnOnce(&mut Stage) -> T) -> T {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::Stage(stage),
            ..
        }) => f(stage),
        _ => fallback,
    }
}

pub(crate) static STAGE_VTABLE: StageVtable = StageVtable {
    set_position_um: stage_set_position_um,
    set_relative_position_um: stage_set_relative_position_um,
    get_position_um: stage_get_position_um,
    set_position_steps: stage_set_position_steps,
    get_position_steps: stage_get_position_steps,
    set_origin: stage_set_origin,
    set_adapter_origin_um: stage_set_adapter_origin_um,
    get_limits: stage_get_limits,
    move_velocity: stage_move_velocity,
    stop: stage_stop,
    home: stage_home,
    get_focus_direction: stage_get_focus_direction,
    set_focus_direction: stage_set_focus_direction,
    is_continuous_focus_drive: stage_is_continuous_focus_drive,
};

unsafe extern "C" fn stage_set_position_um(dev: *mut RawDevice, pos: c_double) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| s.move_to(pos))
}

unsafe extern "C" fn stage_set_relative_position_um(dev: *mut RawDevice, d: c_double) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| s.move_to(s.position() + d))
}

unsafe extern "C" fn stage_get_position_um(dev: *mut RawDevice, pos: *mut c_double) -> c_int {
    match (with_stage(dev, None, |s| Some(s.position())), pos.as_mut()) {
        (Some(position), Some(out)) => {
            *out = position;
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn stage_set_position_steps(dev: *mut RawDevice, steps: c_long) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| s.move_to(steps as f64 * STEP_SIZE_UM))
}

unsafe extern "C" fn stage_get_position_steps(dev: *mut RawDevice, steps: *mut c_long) -> c_int {
    match (with_stage(dev, None, |s| Some(s.position())), steps.as_mut()) {
        (Some(position), Some(out)) => {
            *out = to_steps(position);
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn stage_set_origin(dev: *mut RawDevice) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| {
        s.origin_um = s.position_um;
        DEVICE_OK
    })
}

unsafe extern "C" fn stage_set_adapter_origin_um(dev: *mut RawDevice, d: c_double) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| {
        s.origin_um = s.position_um - d;
        DEVICE_OK
    })
}

unsafe extern "C" fn stage_get_limits(
    dev: *mut RawDevice,
    lower: *mut c_double,
    upper: *mut c_double,
) -> c_int {
    let Some(origin) = with_stage(dev, None, |s| Some(s.origin_um)) else {
        return DEVICE_ERR;
    };
    if let Some(lower) = lower.as_mut() {
        *lower = FOCUS_TRAVEL_UM.0 - origin;
    }
    if let Some(upper) = upper.as_mut() {
        *upper = FOCUS_TRAVEL_UM.1 - origin;
    }
    DEVICE_OK
}

unsafe extern "C" fn stage_move_velocity(_dev: *mut RawDevice, _velocity: c_double) -> c_int {
    DEVICE_NOT_SUPPORTED
}

unsafe extern "C" fn stage_stop(_dev: *mut RawDevice) -> c_int {
    DEVICE_OK
}

unsafe extern "C" fn stage_home(dev: *mut RawDevice) -> c_int {
    with_stage(dev, DEVICE_ERR, |s| {
        s.position_um = FOCUS_TRAVEL_UM.0;
        DEVICE_OK
    })
}

unsafe extern "C" fn stage_get_focus_direction(dev: *mut RawDevice) -> c_int {
    with_stage(dev, FOCUS_DIRECTION_UNKNOWN, |s| s.focus_direction)
}

unsafe extern "C" fn stage_set_focus_direction(dev: *mut RawDevice, direction: c_int) {
    with_stage(dev, (), |s| s.focus_direction = direction);
}

unsafe extern "C" fn stage_is_continuous_focus_drive(_dev: *mut RawDevice) -> bool {
    false
}

// =============================================================================
// XY stage
// =============================================================================

#[derive(Debug)]
pub(crate) struct XYStage {
    position_um: (f64, f64),
    origin_um: (f64, f64),
}

impl XYStage {
    pub fn new() -> Self {
        Self {
            position_um: (0.0, 0.0),
            origin_um: (0.0, 0.0),
        }
    }

    fn position(&self) -> (f64, f64) {
        (
            self.position_um.0 - self.origin_um.0,
            self.position_um.1 - self.origin_um.1,
        )
    }

    fn move_to(&mut self, x: f64, y: f64) -> c_int {
        let absolute = (x + self.origin_um.0, y + self.origin_um.1);
        if !within(XY_TRAVEL_UM, absolute.0) || !within(XY_TRAVEL_UM, absolute.1) {
            return DEVICE_UNKNOWN_POSITION;
        }
        self.position_um = absolute;
        DEVICE_OK
    }
}

unsafe fn with_xy<T>(dev: *mut RawDevice, fallback: T, f: impl FnOnce(&mut XYStage) -> T) -> T {
    match demo(dev) {
        Some(DemoDevice {
            kind: Kind::XYStage(stage),
            ..
        }) => f(stage),
        _ => fallback,
    }
}

pub(crate) static XY_STAGE_VTABLE: XYStageVtable = XYStageVtable {
    set_position_um: xy_set_position_um,
    set_relative_position_um: xy_set_relative_position_um,
    get_position_um: xy_get_position_um,
    set_position_steps: xy_set_position_steps,
    get_position_steps: xy_get_position_steps,
    set_origin: xy_set_origin,
    set_adapter_origin_um: xy_set_adapter_origin_um,
    get_limits_um: xy_get_limits_um,
    get_step_size_x_um: xy_get_step_size_um,
    get_step_size_y_um: xy_get_step_size_um,
    stop: xy_stop,
    home: xy_home,
};

unsafe extern "C" fn xy_set_position_um(dev: *mut RawDevice, x: c_double, y: c_double) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| s.move_to(x, y))
}

unsafe extern "C" fn xy_set_relative_position_um(
    dev: *mut RawDevice,
    dx: c_double,
    dy: c_double,
) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| {
        let (x, y) = s.position();
        s.move_to(x + dx, y + dy)
    })
}

unsafe extern "C" fn xy_get_position_um(
    dev: *mut RawDevice,
    x: *mut c_double,
    y: *mut c_double,
) -> c_int {
    match (with_xy(dev, None, |s| Some(s.position())), x.as_mut(), y.as_mut()) {
        (Some((px, py)), Some(x), Some(y)) => {
            *x = px;
            *y = py;
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn xy_set_position_steps(dev: *mut RawDevice, x: c_long, y: c_long) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| {
        s.move_to(x as f64 * STEP_SIZE_UM, y as f64 * STEP_SIZE_UM)
    })
}

unsafe extern "C" fn xy_get_position_steps(
    dev: *mut RawDevice,
    x: *mut c_long,
    y: *mut c_long,
) -> c_int {
    match (with_xy(dev, None, |s| Some(s.position())), x.as_mut(), y.as_mut()) {
        (Some((px, py)), Some(x), Some(y)) => {
            *x = to_steps(px);
            *y = to_steps(py);
            DEVICE_OK
        }
        _ => DEVICE_ERR,
    }
}

unsafe extern "C" fn xy_set_origin(dev: *mut RawDevice) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| {
        s.origin_um = s.position_um;
        DEVICE_OK
    })
}

unsafe extern "C" fn xy_set_adapter_origin_um(
    dev: *mut RawDevice,
    x: c_double,
    y: c_double,
) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| {
        s.origin_um = (s.position_um.0 - x, s.position_um.1 - y);
        DEVICE_OK
    })
}

unsafe extern "C" fn xy_get_limits_um(
    dev: *mut RawDevice,
    x_min: *mut c_double,
    x_max: *mut c_double,
    y_min: *mut c_double,
    y_max: *mut c_double,
) -> c_int {
    let Some(origin) = with_xy(dev, None, |s| Some(s.origin_um)) else {
        return DEVICE_ERR;
    };
    let limits = [
        (x_min, XY_TRAVEL_UM.0 - origin.0),
        (x_max, XY_TRAVEL_UM.1 - origin.0),
        (y_min, XY_TRAVEL_UM.0 - origin.1),
        (y_max, XY_TRAVEL_UM.1 - origin.1),
    ];
    for (out, value) in limits {
        if let Some(out) = out.as_mut() {
            *out = value;
        }
    }
    DEVICE_OK
}

unsafe extern "C" fn xy_get_step_size_um(_dev: *mut RawDevice) -> c_double {
    STEP_SIZE_UM
}

unsafe extern "C" fn xy_stop(_dev: *mut RawDevice) -> c_int {
    DEVICE_OK
}

unsafe extern "C" fn xy_home(dev: *mut RawDevice) -> c_int {
    with_xy(dev, DEVICE_ERR, |s| {
        s.position_um = (0.0, 0.0);
        DEVICE_OK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_stage_rejects_positions_outside_travel() {
        let mut stage = Stage::new();
        assert_eq!(stage.move_to(-1.0), DEVICE_UNKNOWN_POSITION);
        assert_eq!(stage.move_to(250.0), DEVICE_OK);
        assert_eq!(stage.position(), 250.0);
    }

    #[test]
    fn origin_shifts_reported_position() {
        let mut stage = XYStage::new();
        assert_eq!(stage.move_to(100.0, -20.0), DEVICE_OK);
        stage.origin_um = stage.position_um;
        assert_eq!(stage.position(), (0.0, 0.0));
        assert_eq!(stage.move_to(5.0, 5.0), DEVICE_OK);
        assert_eq!(stage.position_um, (105.0, -15.0));
    }
}
