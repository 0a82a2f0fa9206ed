//! Car map surface ownership and observer fan-out

pub mod composite;
pub mod session;

pub use composite::CompositeSurfaceObserver;
pub use session::{
    CarMapObserver, CarMapSurface, RenderTarget, SurfaceId, SurfaceSession, SurfaceSnapshot,
};
