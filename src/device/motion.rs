//! Positioning capabilities: focus stages, XY stages, galvo scanners and
//! autofocus devices.

use super::capability::capability_view;
use crate::error::{MmError, MmResult};
use crate::ffi::StrBuffer;
use crate::types::{DeviceType, FocusDirection};
use mmdevice_sys::{AutoFocusVtable, GalvoVtable, StageVtable, XYStageVtable};
use std::ffi::c_long;

fn to_steps(steps: i64) -> MmResult<c_long> {
    c_long::try_from(steps)
        .map_err(|_| MmError::InvalidArgument(format!("step position {steps} out of range")))
}

// SAFETY (every native call in this file): the closures run inside
// `Bound::call`, which holds the module lock and passes this device's object
// together with its checked capability table.

capability_view!(
    /// Single-axis (focus) stage.
    Stage,
    StageVtable,
    DeviceType::Stage
);

impl Stage {
    /// Move to an absolute position in micrometres.
    pub fn set_position_um(&self, pos: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_position_um)(raw, pos) })
    }

    /// Move by `delta` micrometres.
    pub fn set_relative_position_um(&self, delta: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_relative_position_um)(raw, delta) })
    }

    /// Current position in micrometres.
    pub fn position_um(&self) -> MmResult<f64> {
        let mut pos = 0.0;
        self.inner.status(|vt, raw| unsafe { (vt.get_position_um)(raw, &mut pos) })?;
        Ok(pos)
    }

    /// Move to an absolute position in motor steps.
    pub fn set_position_steps(&self, steps: i64) -> MmResult<()> {
        let steps = to_steps(steps)?;
        self.inner.status(|vt, raw| unsafe { (vt.set_position_steps)(raw, steps) })
    }

    /// Current position in motor steps.
    pub fn position_steps(&self) -> MmResult<i64> {
        let mut steps: c_long = 0;
        self.inner.status(|vt, raw| unsafe { (vt.get_position_steps)(raw, &mut steps) })?;
        Ok(i64::from(steps))
    }

    /// Make the current position the origin.
    pub fn set_origin(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_origin)(raw) })
    }

    /// Define the current position as `offset` micrometres.
    pub fn set_adapter_origin_um(&self, offset: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_adapter_origin_um)(raw, offset) })
    }

    /// `(lower, upper)` travel limits in micrometres.
    pub fn limits(&self) -> MmResult<(f64, f64)> {
        let (mut lower, mut upper) = (0.0, 0.0);
        self.inner.status(|vt, raw| unsafe { (vt.get_limits)(raw, &mut lower, &mut upper) })?;
        Ok((lower, upper))
    }

    /// Start moving at a constant velocity in micrometres per second.
    pub fn move_velocity(&self, velocity: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.move_velocity)(raw, velocity) })
    }

    /// Stop any motion.
    pub fn stop(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.stop)(raw) })
    }

    /// Run the homing sequence.
    pub fn home(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.home)(raw) })
    }

    /// Direction of positive moves relative to the sample.
    pub fn focus_direction(&self) -> FocusDirection {
        FocusDirection::from_raw(self.inner.call(|vt, raw| unsafe { (vt.get_focus_direction)(raw) }))
    }

    /// Declare the direction of positive moves.
    pub fn set_focus_direction(&self, direction: FocusDirection) {
        let raw_direction = direction.as_raw();
        self.inner
            .call(|vt, raw| unsafe { (vt.set_focus_direction)(raw, raw_direction) });
    }

    /// Whether the stage is a continuous-focus drive.
    pub fn is_continuous_focus_drive(&self) -> bool {
        self.inner.call(|vt, raw| unsafe { (vt.is_continuous_focus_drive)(raw) })
    }
}

capability_view!(
    /// Two-axis stage.
    XYStage,
    XYStageVtable,
    DeviceType::XYStage
);

/// `(x_min, x_max, y_min, y_max)` travel limits in micrometres.
pub type XYLimits = (f64, f64, f64, f64);

impl XYStage {
    /// Move to an absolute position in micrometres.
    pub fn set_position_um(&self, x: f64, y: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_position_um)(raw, x, y) })
    }

    /// Move by `(dx, dy)` micrometres.
    pub fn set_relative_position_um(&self, dx: f64, dy: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_relative_position_um)(raw, dx, dy) })
    }

    /// Current `(x, y)` position in micrometres.
    pub fn position_um(&self) -> MmResult<(f64, f64)> {
        let (mut x, mut y) = (0.0, 0.0);
        self.inner.status(|vt, raw| unsafe { (vt.get_position_um)(raw, &mut x, &mut y) })?;
        Ok((x, y))
    }

    /// Move to an absolute position in motor steps.
    pub fn set_position_steps(&self, x: i64, y: i64) -> MmResult<()> {
        let (x, y) = (to_steps(x)?, to_steps(y)?);
        self.inner.status(|vt, raw| unsafe { (vt.set_position_steps)(raw, x, y) })
    }

    /// Current `(x, y)` position in motor steps.
    pub fn position_steps(&self) -> MmResult<(i64, i64)> {
        let (mut x, mut y): (c_long, c_long) = (0, 0);
        self.inner.status(|vt, raw| unsafe { (vt.get_position_steps)(raw, &mut x, &mut y) })?;
        Ok((i64::from(x), i64::from(y)))
    }

    /// Make the current position the origin.
    pub fn set_origin(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_origin)(raw) })
    }

    /// Define the current position as `(x, y)` micrometres.
    pub fn set_adapter_origin_um(&self, x: f64, y: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_adapter_origin_um)(raw, x, y) })
    }

    /// Travel limits in micrometres.
    pub fn limits_um(&self) -> MmResult<XYLimits> {
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (0.0, 0.0, 0.0, 0.0);
        self.inner.status(|vt, raw| unsafe {
            (vt.get_limits_um)(raw, &mut x_min, &mut x_max, &mut y_min, &mut y_max)
        })?;
        Ok((x_min, x_max, y_min, y_max))
    }

    /// `(x, y)` step sizes in micrometres.
    pub fn step_size_um(&self) -> (f64, f64) {
        self.inner.call(|vt, raw| unsafe {
            ((vt.get_step_size_x_um)(raw), (vt.get_step_size_y_um)(raw))
        })
    }

    /// Stop any motion.
    pub fn stop(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.stop)(raw) })
    }

    /// Run the homing sequence.
    pub fn home(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.home)(raw) })
    }
}

capability_view!(
    /// Galvo scanner.
    Galvo,
    GalvoVtable,
    DeviceType::Galvo
);

impl Galvo {
    /// Move to `(x, y)` and illuminate for `time_us` microseconds.
    pub fn point_and_fire(&self, x: f64, y: f64, time_us: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.point_and_fire)(raw, x, y, time_us) })
    }

    /// Dwell time per spot in microseconds.
    pub fn set_spot_interval(&self, interval_us: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_spot_interval)(raw, interval_us) })
    }

    /// Move to `(x, y)` without firing.
    pub fn set_position(&self, x: f64, y: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_position)(raw, x, y) })
    }

    /// Current `(x, y)` position.
    pub fn position(&self) -> MmResult<(f64, f64)> {
        let (mut x, mut y) = (0.0, 0.0);
        self.inner.status(|vt, raw| unsafe { (vt.get_position)(raw, &mut x, &mut y) })?;
        Ok((x, y))
    }

    /// Switch illumination on or off.
    pub fn set_illumination_state(&self, on: bool) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_illumination_state)(raw, on) })
    }

    /// `(minimum, range)` of the X axis.
    pub fn x_range(&self) -> (f64, f64) {
        self.inner
            .call(|vt, raw| unsafe { ((vt.get_x_minimum)(raw), (vt.get_x_range)(raw)) })
    }

    /// `(minimum, range)` of the Y axis.
    pub fn y_range(&self) -> (f64, f64) {
        self.inner
            .call(|vt, raw| unsafe { ((vt.get_y_minimum)(raw), (vt.get_y_range)(raw)) })
    }

    /// Append a vertex to polygon `index`.
    pub fn add_polygon_vertex(&self, index: i32, x: f64, y: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.add_polygon_vertex)(raw, index, x, y) })
    }

    /// Remove all polygons.
    pub fn delete_polygons(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.delete_polygons)(raw) })
    }

    /// Upload the polygons to the device.
    pub fn load_polygons(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.load_polygons)(raw) })
    }

    /// Number of times each polygon run repeats.
    pub fn set_polygon_repetitions(&self, repetitions: i32) -> MmResult<()> {
        self.inner
            .status(|vt, raw| unsafe { (vt.set_polygon_repetitions)(raw, repetitions) })
    }

    /// Illuminate the loaded polygons.
    pub fn run_polygons(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.run_polygons)(raw) })
    }

    /// Start the loaded sequence.
    pub fn run_sequence(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.run_sequence)(raw) })
    }

    /// Stop a running sequence.
    pub fn stop_sequence(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.stop_sequence)(raw) })
    }

    /// Name of the active channel.
    pub fn channel(&self) -> MmResult<String> {
        let mut buf = StrBuffer::new();
        self.inner
            .status(|vt, raw| unsafe { (vt.get_channel)(raw, buf.as_mut_ptr(), buf.len()) })?;
        Ok(buf.into_string())
    }
}

capability_view!(
    /// Autofocus device.
    AutoFocus,
    AutoFocusVtable,
    DeviceType::AutoFocus
);

impl AutoFocus {
    /// Enable or disable continuous focusing.
    pub fn set_continuous_focusing(&self, on: bool) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_continuous_focusing)(raw, on) })
    }

    /// Whether continuous focusing is enabled.
    pub fn continuous_focusing(&self) -> MmResult<bool> {
        let mut on = false;
        self.inner
            .status(|vt, raw| unsafe { (vt.get_continuous_focusing)(raw, &mut on) })?;
        Ok(on)
    }

    /// Whether continuous focus is locked on.
    pub fn is_continuous_focus_locked(&self) -> bool {
        self.inner.call(|vt, raw| unsafe { (vt.is_continuous_focus_locked)(raw) })
    }

    /// Run a full focus search.
    pub fn full_focus(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.full_focus)(raw) })
    }

    /// Refine focus around the current position.
    pub fn incremental_focus(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.incremental_focus)(raw) })
    }

    /// Score of the last focus run.
    pub fn last_focus_score(&self) -> MmResult<f64> {
        let mut score = 0.0;
        self.inner
            .status(|vt, raw| unsafe { (vt.get_last_focus_score)(raw, &mut score) })?;
        Ok(score)
    }

    /// Focus score at the current position.
    pub fn current_focus_score(&self) -> MmResult<f64> {
        let mut score = 0.0;
        self.inner
            .status(|vt, raw| unsafe { (vt.get_current_focus_score)(raw, &mut score) })?;
        Ok(score)
    }

    /// Let the device choose its own focus parameters.
    pub fn auto_set_parameters(&self) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.auto_set_parameters)(raw) })
    }

    /// Focus offset.
    pub fn offset(&self) -> MmResult<f64> {
        let mut offset = 0.0;
        self.inner.status(|vt, raw| unsafe { (vt.get_offset)(raw, &mut offset) })?;
        Ok(offset)
    }

    /// Set the focus offset.
    pub fn set_offset(&self, offset: f64) -> MmResult<()> {
        self.inner.status(|vt, raw| unsafe { (vt.set_offset)(raw, offset) })
    }
}
