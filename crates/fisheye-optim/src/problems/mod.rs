pub mod fisheye_intrinsics;
