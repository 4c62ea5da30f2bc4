//! Binary encoding of the estimator records, used to record a robot's inputs and replay them.
//!
//! Everything is little-endian. Vectors and strings carry a `u32` length prefix, booleans and
//! enum discriminants take a single byte and fixed size matrices are written element by element
//! in column-major order without a prefix.
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::{Matrix3, Vector3};

use crate::error::{Error, Result};
use crate::types::{
    AbsCoord, ActionCommand, ActionType, BallInfo, BehaviourSharedData, BodyCommand,
    BroadcastData, CompetitionType, EstimatorInfoIn, EstimatorInfoInit, FieldFeatureInfo,
    FieldFeatureType, GamePhase, GameState, HeadCommand, InitialPoseType, Odometry, Penalty,
    RobotType, RobotVisionInfo, RrCoord, SensorValues, SetPlay, SharedStateEstimationBundle,
};

/// Allows records to be encoded to raw bytes. See [`Decode`] for the reverse.
pub trait Encode {
    /// Writes the encoded value to `write`, for example a buffer or a file.
    fn encode(&self, write: impl Write) -> Result<()>;

    /// The number of bytes [`Encode::encode`] writes.
    fn encode_len(&self) -> usize;
}

/// Allows records to be decoded from raw bytes. See [`Encode`] for the reverse.
pub trait Decode {
    /// Reads a single value from `read`, for example a buffer or a file.
    fn decode(read: impl Read) -> Result<Self>
    where
        Self: Sized;
}

impl Encode for bool {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        write.write_u8(u8::from(*self))?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        1
    }
}

impl Decode for bool {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok(read.read_u8()? != 0)
    }
}

impl Encode for u32 {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        write.write_u32::<LittleEndian>(*self)?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        4
    }
}

impl Decode for u32 {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok(read.read_u32::<LittleEndian>()?)
    }
}

impl Encode for i32 {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        write.write_i32::<LittleEndian>(*self)?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        4
    }
}

impl Decode for i32 {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok(read.read_i32::<LittleEndian>()?)
    }
}

impl Encode for i64 {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        write.write_i64::<LittleEndian>(*self)?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        8
    }
}

impl Decode for i64 {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok(read.read_i64::<LittleEndian>()?)
    }
}

impl Encode for f32 {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        write.write_f32::<LittleEndian>(*self)?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        4
    }
}

impl Decode for f32 {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok(read.read_f32::<LittleEndian>()?)
    }
}

/// Writes a `u32` length prefix.
fn encode_length(length: usize, write: impl Write) -> Result<()> {
    let length = u32::try_from(length).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cannot record {length} elements"),
        )
    })?;
    length.encode(write)
}

impl Encode for String {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        encode_length(self.len(), &mut write)?;
        write.write_all(self.as_bytes())?;
        Ok(())
    }

    fn encode_len(&self) -> usize {
        4 + self.len()
    }
}

impl Decode for String {
    fn decode(mut read: impl Read) -> Result<Self> {
        let length = u32::decode(&mut read)? as usize;
        let mut bytes = Vec::new();
        read.take(length as u64).read_to_end(&mut bytes)?;
        if bytes.len() < length {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(String::from_utf8(bytes)?)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        encode_length(self.len(), &mut write)?;
        for item in self {
            item.encode(&mut write)?;
        }
        Ok(())
    }

    fn encode_len(&self) -> usize {
        4 + self.iter().map(Encode::encode_len).sum::<usize>()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(mut read: impl Read) -> Result<Self> {
        let length = u32::decode(&mut read)? as usize;
        // The length comes from the stream, do not trust it for the allocation.
        let mut items = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            items.push(T::decode(&mut read)?);
        }
        Ok(items)
    }
}

impl Encode for Vector3<f32> {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        for value in self.iter() {
            value.encode(&mut write)?;
        }
        Ok(())
    }

    fn encode_len(&self) -> usize {
        3 * 4
    }
}

impl Decode for Vector3<f32> {
    fn decode(mut read: impl Read) -> Result<Self> {
        let mut vector = Vector3::zeros();
        for value in vector.iter_mut() {
            *value = f32::decode(&mut read)?;
        }
        Ok(vector)
    }
}

impl Encode for Matrix3<f32> {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        for value in self.iter() {
            value.encode(&mut write)?;
        }
        Ok(())
    }

    fn encode_len(&self) -> usize {
        9 * 4
    }
}

impl Decode for Matrix3<f32> {
    fn decode(mut read: impl Read) -> Result<Self> {
        let mut matrix = Matrix3::zeros();
        for value in matrix.iter_mut() {
            *value = f32::decode(&mut read)?;
        }
        Ok(matrix)
    }
}

/// Implements the codec for a `#[repr(u8)]` enum with a `from_repr` constructor.
macro_rules! enum_codec {
    ($($name:ident),* $(,)?) => {
        $(
            impl Encode for $name {
                fn encode(&self, mut write: impl Write) -> Result<()> {
                    write.write_u8(*self as u8)?;
                    Ok(())
                }

                fn encode_len(&self) -> usize {
                    1
                }
            }

            impl Decode for $name {
                fn decode(mut read: impl Read) -> Result<Self> {
                    let value = read.read_u8()?;
                    $name::from_repr(value).ok_or(Error::InvalidDiscriminant {
                        value,
                        name: stringify!($name),
                    })
                }
            }
        )*
    };
}

enum_codec!(
    ActionType,
    CompetitionType,
    FieldFeatureType,
    GamePhase,
    GameState,
    Penalty,
    RobotType,
    SetPlay,
);

/// Implements the codec for a struct by encoding its fields in the listed order.
macro_rules! struct_codec {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl Encode for $name {
            fn encode(&self, mut write: impl Write) -> Result<()> {
                $(self.$field.encode(&mut write)?;)*
                Ok(())
            }

            fn encode_len(&self) -> usize {
                0 $(+ self.$field.encode_len())*
            }
        }

        impl Decode for $name {
            fn decode(mut read: impl Read) -> Result<Self> {
                Ok(Self {
                    $($field: Decode::decode(&mut read)?,)*
                })
            }
        }
    };
}

struct_codec!(RrCoord { vec, var });
struct_codec!(AbsCoord { vec, var, weight });
struct_codec!(FieldFeatureInfo { rr, kind });
struct_codec!(BallInfo {
    rr,
    radius,
    image_x,
    image_y,
    top_camera
});
struct_codec!(RobotVisionInfo { rr, kind });
struct_codec!(BodyCommand {
    action_type,
    forward,
    left,
    turn
});
struct_codec!(HeadCommand { yaw, pitch });
struct_codec!(ActionCommand { head, body });
struct_codec!(SensorValues {
    gyroscope_x,
    gyroscope_y,
    head_yaw
});
struct_codec!(Odometry {
    forward,
    left,
    turn
});
struct_codec!(BehaviourSharedData {
    seconds_since_last_kick,
    role,
    playing_ball,
    need_assistance,
    is_assisting,
    is_kicked_off,
    walking_to_x,
    walking_to_y,
    walking_to_h,
    kick_notification,
});
struct_codec!(SharedStateEstimationBundle {
    robot_pos,
    ball_pos_rrc,
    ball_vel_rrc,
    have_ball_update,
});
struct_codec!(BroadcastData {
    player_num,
    robot_pos,
    ball_pos_abs,
    ball_pos_rr,
    shared_state_estimation_bundle,
    behaviour_shared_data,
    action_type,
    uptime,
    game_state,
});
struct_codec!(EstimatorInfoInit {
    player_number,
    team_number,
    initial_pose_type,
    specified_initial_pose,
    skill,
    competition_type,
    state,
    game_phase,
    set_play,
    handle_referee_mistakes,
});
struct_codec!(EstimatorInfoIn {
    field_features,
    balls,
    competition_type,
    state,
    game_phase,
    set_play,
    kicking_team,
    behaviour_shared_data,
    penalty,
    active,
    incapacitated,
    have_pending_outgoing_shared_bundle,
    have_pending_incoming_shared_bundle,
    incoming_broadcast_data,
    visual_robots,
    head_yaw,
    is_incapacitated,
    odometry_diff,
    dt_in_seconds,
    action_command_body,
    sensor_values,
});

impl Encode for [f32; 3] {
    fn encode(&self, mut write: impl Write) -> Result<()> {
        for value in self {
            value.encode(&mut write)?;
        }
        Ok(())
    }

    fn encode_len(&self) -> usize {
        3 * 4
    }
}

impl Decode for [f32; 3] {
    fn decode(mut read: impl Read) -> Result<Self> {
        Ok([
            f32::decode(&mut read)?,
            f32::decode(&mut read)?,
            f32::decode(&mut read)?,
        ])
    }
}

/// Stored by name, unknown names fall back to [`InitialPoseType::Game`].
impl Encode for InitialPoseType {
    fn encode(&self, write: impl Write) -> Result<()> {
        self.to_string().encode(write)
    }

    fn encode_len(&self) -> usize {
        self.to_string().encode_len()
    }
}

impl Decode for InitialPoseType {
    fn decode(read: impl Read) -> Result<Self> {
        Ok(InitialPoseType::parse_or_game(&String::decode(read)?))
    }
}
