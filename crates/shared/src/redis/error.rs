/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

#[macros::add_error]
pub enum RedisError {
    SerializationError(String),
    DeserializationError(String),
    RedisConnectionError(String),
    PingFailed(String),
    SetFailed(String),
    GetFailed(String),
    MGetFailed(String),
    DeleteFailed(String),
    IncrFailed(String),
    ScanFailed(String),
    GeoAddFailed(String),
    GeoSearchFailed(String),
    ZRemFailed(String),
    ZCardFailed(String),
}

impl RedisError {
    pub fn message(&self) -> String {
        match self {
            RedisError::SerializationError(err) => err.to_string(),
            RedisError::DeserializationError(err) => err.to_string(),
            RedisError::RedisConnectionError(err) => format!("Redis Connection Error : {err}"),
            RedisError::PingFailed(err)
            | RedisError::SetFailed(err)
            | RedisError::GetFailed(err)
            | RedisError::MGetFailed(err)
            | RedisError::DeleteFailed(err)
            | RedisError::IncrFailed(err)
            | RedisError::ScanFailed(err)
            | RedisError::GeoAddFailed(err)
            | RedisError::GeoSearchFailed(err)
            | RedisError::ZRemFailed(err)
            | RedisError::ZCardFailed(err) => format!("Redis Error : {err}"),
        }
    }

    pub fn code(&self) -> String {
        match self {
            RedisError::SerializationError(_) => "SERIALIZATION_ERROR",
            RedisError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            RedisError::RedisConnectionError(_) => "REDIS_CONNECTION_FAILED",
            RedisError::PingFailed(_) => "PING_FAILED",
            RedisError::SetFailed(_) => "SET_FAILED",
            RedisError::GetFailed(_) => "GET_FAILED",
            RedisError::MGetFailed(_) => "MGET_FAILED",
            RedisError::DeleteFailed(_) => "DELETE_FAILED",
            RedisError::IncrFailed(_) => "INCR_FAILED",
            RedisError::ScanFailed(_) => "SCAN_FAILED",
            RedisError::GeoAddFailed(_) => "GEOADD_FAILED",
            RedisError::GeoSearchFailed(_) => "GEOSEARCH_FAILED",
            RedisError::ZRemFailed(_) => "ZREM_FAILED",
            RedisError::ZCardFailed(_) => "ZCARD_FAILED",
        }
        .to_string()
    }
}
