//! Typed constructors for the board's ASCII command set.
//!
//! Each constructor validates its parameters against the documented
//! ranges before anything reaches the wire. Stepper moves additionally
//! check the step rate each physical motor would have to sustain: the
//! two motors drive linear combinations of the device axes, so the rate
//! limit applies to the sum and difference of the per-axis counts.

use plotkit_core::ProtocolError;

/// Slowest sustainable step rate, steps per second.
pub const MIN_STEP_RATE: f64 = 1.31;
/// Fastest sustainable step rate, steps per second.
pub const MAX_STEP_RATE: f64 = 25_000.0;

const MAX_STEPPER_DURATION_MS: u32 = 16_777_215;
const MAX_STEPPER_STEPS: i64 = 16_777_215;
const MAX_HOME_POSITION: i64 = 4_294_967;

/// One command in the board's ASCII protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum EbbCommand {
    /// `R` - firmware state reset.
    Reset,
    /// `RB` - full reboot.
    Reboot,
    /// `EM,e1,e2` - enable or disable each motor driver.
    EnableMotors { motor1: bool, motor2: bool },
    /// `TP[,dur]` - toggle the pen, optionally holding for `dur` ms.
    TogglePen { duration_ms: Option<u32> },
    /// `SP,v[,dur[,pin]]` - set the pen state; `up` maps to `v = 1`.
    SetPenState {
        up: bool,
        duration_ms: Option<u32>,
        pin: Option<u8>,
    },
    /// `QP` - query the pen state; the board replies `0` or `1`.
    QueryPen,
    /// `HM,f[,p1,p2]` - home, or move to an absolute step position.
    HomeMove {
        step_rate: u32,
        position: Option<(i64, i64)>,
    },
    /// `SC,p,v` - set a configuration parameter.
    Configure { parameter: u8, value: u16 },
    /// `XM,dur,a,b` - timed stepper move in device-axis step counts.
    /// Both counts zero is a pure delay.
    StepperMove {
        duration_ms: u32,
        axis_a: i32,
        axis_b: i32,
    },
}

impl EbbCommand {
    /// Encode to the wire form (without the trailing CR), validating
    /// every parameter range.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        match *self {
            EbbCommand::Reset => Ok("R".to_string()),
            EbbCommand::Reboot => Ok("RB".to_string()),
            EbbCommand::EnableMotors { motor1, motor2 } => {
                Ok(format!("EM,{},{}", motor1 as u8, motor2 as u8))
            }
            EbbCommand::TogglePen { duration_ms } => match duration_ms {
                None => Ok("TP".to_string()),
                Some(dur) => {
                    check_range("TP", "dur", dur as i64, 1, 65_535)?;
                    Ok(format!("TP,{}", dur))
                }
            },
            EbbCommand::SetPenState {
                up,
                duration_ms,
                pin,
            } => {
                let mut cmd = format!("SP,{}", up as u8);
                if let Some(dur) = duration_ms {
                    check_range("SP", "dur", dur as i64, 1, 65_535)?;
                    cmd.push_str(&format!(",{}", dur));
                    if let Some(pin) = pin {
                        check_range("SP", "pin", pin as i64, 0, 7)?;
                        cmd.push_str(&format!(",{}", pin));
                    }
                }
                Ok(cmd)
            }
            EbbCommand::QueryPen => Ok("QP".to_string()),
            EbbCommand::HomeMove {
                step_rate,
                position,
            } => {
                check_range("HM", "rate", step_rate as i64, 2, 25_000)?;
                match position {
                    None => Ok(format!("HM,{}", step_rate)),
                    Some((p1, p2)) => {
                        check_range("HM", "p1", p1, -MAX_HOME_POSITION, MAX_HOME_POSITION)?;
                        check_range("HM", "p2", p2, -MAX_HOME_POSITION, MAX_HOME_POSITION)?;
                        Ok(format!("HM,{},{},{}", step_rate, p1, p2))
                    }
                }
            }
            EbbCommand::Configure { parameter, value } => {
                Ok(format!("SC,{},{}", parameter, value))
            }
            EbbCommand::StepperMove {
                duration_ms,
                axis_a,
                axis_b,
            } => {
                check_range(
                    "XM",
                    "dur",
                    duration_ms as i64,
                    1,
                    MAX_STEPPER_DURATION_MS as i64,
                )?;
                check_range("XM", "a", axis_a as i64, -MAX_STEPPER_STEPS, MAX_STEPPER_STEPS)?;
                check_range("XM", "b", axis_b as i64, -MAX_STEPPER_STEPS, MAX_STEPPER_STEPS)?;
                check_step_rates(duration_ms, axis_a, axis_b)?;
                Ok(format!("XM,{},{},{}", duration_ms, axis_a, axis_b))
            }
        }
    }

    /// Number of CR-terminated reply lines to expect when this command
    /// is sent as a query.
    pub fn expected_lines(&self) -> usize {
        1
    }
}

fn check_range(
    command: &'static str,
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ProtocolError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ProtocolError::ParameterOutOfRange {
            command,
            field,
            value,
        })
    }
}

/// Check the step rate each physical motor must sustain.
///
/// The motors resolve to the sum and difference of the device-axis
/// counts. A motor that does not move is exempt; both-zero moves are a
/// pure delay and always legal.
fn check_step_rates(duration_ms: u32, axis_a: i32, axis_b: i32) -> Result<(), ProtocolError> {
    let resolved = [
        (1u8, axis_a as i64 + axis_b as i64),
        (2u8, axis_a as i64 - axis_b as i64),
    ];
    for (axis, steps) in resolved {
        if steps == 0 {
            continue;
        }
        let rate = steps.abs() as f64 * 1000.0 / duration_ms as f64;
        if !(MIN_STEP_RATE..=MAX_STEP_RATE).contains(&rate) {
            return Err(ProtocolError::StepRateOutOfRange { axis, rate });
        }
    }
    Ok(())
}
