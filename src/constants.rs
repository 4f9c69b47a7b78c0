/// 比特分配表：索引为 "每像素总位数 - 1"，值为 (B, G, R) 三个通道各自写入的位数。
/// 第 `k` 行的三项之和恰好为 `k + 1`。
pub const BIT_ALLOCATION: [[u8; 3]; 12] = [
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [1, 1, 2],
    [2, 1, 2],
    [2, 2, 2],
    [2, 2, 3],
    [3, 2, 3],
    [3, 3, 3],
    [3, 3, 4],
    [4, 3, 4],
    [4, 4, 4],
];

/// 比特分配表的级数。所需级别达到此值即意味着载体容量不足。
pub const BIT_LEVELS: usize = BIT_ALLOCATION.len();

/// 载体末尾为头部保留的像素数。
pub const HEADER_PIXELS: usize = 7;

/// 头部占用的通道数：前 20 个通道各存 2 bit，第 21 个通道保持原样，参与校验。
pub const HEADER_CHANNELS: usize = 21;

/// 头部描述符的字节数 (rows 2 字节、灰度位 + cols 2 字节、校验 1 字节)。
pub const HEADER_BYTES: usize = 5;

/// 每个头部通道存储的位数。
pub const HEADER_BITS_PER_CHANNEL: usize = 2;

/// 载体至少需要的像素数：7 个头部像素 + 1 个数据像素。
pub const MIN_CARRIER_PIXELS: usize = HEADER_PIXELS + 1;

/// 任意图像的最大行数/列数。
pub const MAX_DIMENSION: usize = 65_535;

/// 载荷列数上限：头部中的列字段只有 15 位。
pub const MAX_PAYLOAD_COLS: usize = 0x7FFF;

/// 载体图像的通道数 (B, G, R)。
pub const CARRIER_CHANNELS: usize = 3;

/// 编码结果的默认文件名，同时也是保存失败时的回退文件名。
pub const DEFAULT_ENCODED_FILE: &str = "Encoded.png";

/// 解码结果的默认文件名，同时也是保存失败时的回退文件名。
pub const DEFAULT_DECODED_FILE: &str = "Decoded.png";
