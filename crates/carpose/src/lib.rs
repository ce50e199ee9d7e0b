#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use carpose_tensor as tensor;

#[doc(inline)]
pub use carpose_3d as k3d;

#[doc(inline)]
pub use carpose_pose as pose;

#[doc(inline)]
pub use carpose_target as target;

#[doc(inline)]
pub use carpose_detect as detect;
